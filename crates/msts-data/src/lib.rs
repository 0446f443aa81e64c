pub mod counted_list;
pub mod dispatch;
pub mod env_file;
pub mod numeric;
pub mod rdb_file;
pub mod stf_lexer;
pub mod stf_reader;
