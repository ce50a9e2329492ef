pub(crate) mod analyses;
pub(crate) mod assignments;
pub(crate) mod classes;
pub(crate) mod images;
pub(crate) mod jobs;
pub(crate) mod policies;
pub(crate) mod provas;
pub(crate) mod questions;
pub(crate) mod reviews;
pub(crate) mod schools;
pub(crate) mod subjects;
pub(crate) mod templates;
pub(crate) mod users;
