pub(crate) mod ai_review;
pub(crate) mod audit;
pub(crate) mod rules;
pub(crate) mod storage;
pub(crate) mod submission_policy;
