//! Constants used throughout the form core crate.
//!
//! This module contains the reserved field identities, status values and default settings the
//! DSF forms rely on.

/// Code system of the BPMN message-name Task input.
pub const BPMN_MESSAGE_SYSTEM: &str = "http://dsf.dev/fhir/CodeSystem/bpmn-message";

/// Code of the Task input naming the BPMN message that starts the process.
pub const MESSAGE_NAME_CODE: &str = "message-name";

/// Code of the Task input carrying the process business key.
pub const BUSINESS_KEY_CODE: &str = "business-key";

/// Code of the Task input carrying the process correlation key.
pub const CORRELATION_KEY_CODE: &str = "correlation-key";

/// QuestionnaireResponse item link id of the process business key.
pub const BUSINESS_KEY_LINK_ID: &str = "business-key";

/// QuestionnaireResponse item link id of the user task id.
pub const USER_TASK_ID_LINK_ID: &str = "user-task-id";

/// Slice ids in a Task profile that never get a form row.
pub const RESERVED_SLICE_MARKERS: [&str; 3] =
    [MESSAGE_NAME_CODE, BUSINESS_KEY_CODE, CORRELATION_KEY_CODE];

/// Error label of Task input rows.
pub const TASK_INPUT_LABEL: &str = "Input";

/// Error label of QuestionnaireResponse item rows.
pub const QUESTIONNAIRE_ITEM_LABEL: &str = "Item";

/// Differential id prefix of Task input slices.
pub const TASK_INPUT_SLICE_PREFIX: &str = "Task.input:";

/// Differential path of the Task input element itself (carries min/max).
pub const TASK_INPUT_PATH: &str = "Task.input";

/// Differential path of the fixed input type system.
pub const TASK_INPUT_TYPE_SYSTEM_PATH: &str = "Task.input.type.coding.system";

/// Differential path of the fixed input type code.
pub const TASK_INPUT_TYPE_CODE_PATH: &str = "Task.input.type.coding.code";

/// Differential path of the input value type constraint.
pub const TASK_INPUT_VALUE_PATH: &str = "Task.input.value[x]";

/// Default delay between a successful submission and navigating to the new resource.
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 1_000;

/// Default timeout for requests against the FHIR server.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
