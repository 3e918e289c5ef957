/// UI building blocks
///
/// - Display copy of the active picture (preview.rs)
/// - Page listing with keep/delete markers (file_list.rs)

pub mod file_list;
pub mod preview;
