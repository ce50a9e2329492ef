pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod coordination;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod provas;
pub(crate) mod router;
pub(crate) mod teacher;
pub(crate) mod templates;
