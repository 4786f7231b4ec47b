mod runtime_loop;
pub(crate) mod support;
