//! Command handlers grouped by binary.

pub(crate) mod control;
pub(crate) mod lora;
pub(crate) mod setup;
