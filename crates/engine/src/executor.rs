use std::sync::Arc;

use tracing::{error, info, warn};

use common::{Error, OrderAck, OrderGateway, OrderInstruction, OrderPlan, Result};

/// Result of submitting one instruction.
#[derive(Debug)]
pub struct OrderOutcome {
    pub instruction: OrderInstruction,
    pub result: Result<OrderAck>,
}

/// What happened to each order of a plan, in submission order.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<OrderOutcome>,
    /// Exits never sent because the entry failed.
    pub skipped: Vec<OrderInstruction>,
}

impl ExecutionReport {
    pub fn acks(&self) -> impl Iterator<Item = &OrderAck> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&OrderInstruction, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.instruction, e)))
    }

    pub fn entry_placed(&self) -> bool {
        self.outcomes
            .first()
            .is_some_and(|o| o.instruction.is_entry() && o.result.is_ok())
    }

    /// Every order of the plan was accepted.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Submits a plan's orders one after another.
///
/// No fill checks, retries or cancellation. An entry failure stops the
/// plan; an exit failure does not stop the other exit.
pub struct OrderExecutor {
    gateway: Arc<dyn OrderGateway>,
}

impl OrderExecutor {
    pub fn new(gateway: Arc<dyn OrderGateway>) -> Self {
        Self { gateway }
    }

    pub async fn execute(&self, plan: &OrderPlan) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let mut instructions = plan.instructions().into_iter();

        while let Some(instruction) = instructions.next() {
            let label = instruction.label();
            info!(
                symbol = %instruction.symbol(),
                order = label,
                side = %instruction.side(),
                qty = %instruction.quantity(),
                "Executing order"
            );

            let result = self
                .gateway
                .submit(&instruction)
                .await
                .map_err(|e| Error::OrderSubmission {
                    kind: label.to_string(),
                    reason: e.to_string(),
                });

            let entry_failed = instruction.is_entry() && result.is_err();
            match &result {
                Ok(ack) => info!(order = label, order_id = %ack.order_id, status = %ack.status, "Order accepted"),
                Err(e) => error!(order = label, error = %e, "Order submission failed"),
            }
            report.outcomes.push(OrderOutcome { instruction, result });

            if entry_failed {
                report.skipped.extend(instructions.by_ref());
                warn!(
                    symbol = %plan.symbol,
                    skipped = report.skipped.len(),
                    "Entry failed, exit orders not sent"
                );
                break;
            }
        }
        report
    }
}
