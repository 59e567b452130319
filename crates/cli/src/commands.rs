/// Report generation for a pipeline run
pub mod generate;
