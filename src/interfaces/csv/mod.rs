pub mod intent_reader;
pub mod receipt_writer;
