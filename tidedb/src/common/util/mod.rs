mod document_utils;
mod id_utils;
mod task_util;

pub use document_utils::*;
pub use id_utils::*;
pub(crate) use task_util::*;
