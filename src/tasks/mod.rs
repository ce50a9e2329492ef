pub(crate) mod pdf_render;
pub(crate) mod scheduler;
