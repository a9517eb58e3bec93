pub mod matching;
pub mod object_id;
