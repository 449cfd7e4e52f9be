//! Messaging-surface selectors
//!
//! The external web client revises its DOM between releases; every
//! selector the engine touches lives here so an operator can retarget a
//! revision in one place. Comma lists are CSS selector alternatives
//! matched by a single query.

/// Message composition control inside an open conversation
pub const COMPOSE_BOX: &str = r#"div[contenteditable="true"][data-tab="10"]"#;

/// Modal shown when the deep-linked number is not on the service
pub const INVALID_NUMBER_POPUP: &str = r#"div[data-animate-modal-popup="true"]"#;

/// Primary send affordance
pub const SEND_BUTTON_PRIMARY: &str = r#"span[data-icon="wds-ic-send-filled"]"#;

/// Labeled send control kept by older client revisions
pub const SEND_BUTTON_LABELED: &str = r#"button[data-tab="11"][aria-label="Send"]"#;

/// Outgoing-message marker used to confirm a send landed in the
/// conversation view
pub const OUTGOING_MESSAGE: &str = "div.message-out";

/// Attach affordance; icon name differs across client revisions
pub const ATTACH_CONTROL: &str =
    r#"span[data-icon="plus-rounded"], span[data-icon="clip"]"#;

/// Native file-picker input revealed by the attach control
pub const FILE_INPUT: &str = r#"input[type="file"]"#;

/// Send affordance on the attachment preview
pub const ATTACHMENT_SEND: &str = r#"span[data-icon="send"]"#;
