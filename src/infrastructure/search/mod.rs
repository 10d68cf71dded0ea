//! The multi-stage search pipeline

mod analyzer;
mod evaluator;
mod pipeline;
mod responder;

pub use analyzer::{StrategyAnalyzer, ANALYZE_HEADER};
pub use evaluator::{ResultEvaluator, EVALUATE_HEADER};
pub use pipeline::{PipelineOutcome, SearchPipeline, DEFAULT_MAX_REFINEMENTS};
pub use responder::{remove_duplicate_lines, AnswerResponder, RESPOND_HEADER};
