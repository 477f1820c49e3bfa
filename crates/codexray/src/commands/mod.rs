pub(crate) mod analyze;
pub(crate) mod history;
pub(crate) mod serve;
