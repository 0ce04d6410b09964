//! Resumable source reading

pub mod reader;

pub use reader::{ReadPlan, ReaderReport, ReaderStop, ResumableReader, SourceBatch};
