// SPDX-License-Identifier: MIT

//! Observable events the Supervisor loop produces, mirroring the
//! failure-semantics table at §4.2.4. Exposed so a process wiring this
//! crate can log or meter them; `process_task` does not require a
//! listener.

use agentbus_core::TaskId;
use agentbus_coordinator::CooldownRecord;
use agentbus_runner::RunnerError;

use crate::output::TurnOutputPayload;

#[derive(Debug)]
pub enum SupervisorEvent {
    TurnStarted { task_id: TaskId },
    TurnCompleted { task_id: TaskId, payload: TurnOutputPayload },
    TurnFailed { task_id: TaskId, error: String },
    SupersedeObserved { task_id: TaskId },
    TimeoutObserved { task_id: TaskId },
    CooldownRequired { record: CooldownRecord },
}

impl SupervisorEvent {
    pub fn turn_failed(task_id: TaskId, error: &RunnerError) -> Self {
        SupervisorEvent::TurnFailed {
            task_id,
            error: error.to_string(),
        }
    }
}
