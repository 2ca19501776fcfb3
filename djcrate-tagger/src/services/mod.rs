//! Service modules for the tagging pipeline

pub mod analyzer;
pub mod cleaner;
pub mod parser;
pub mod playlist;
pub mod prompt;
pub mod selector;
pub mod status;
pub mod updater;
pub mod workflow;

pub use analyzer::Analyzer;
pub use cleaner::{clean_collection, CleanReport};
pub use parser::{parse_analysis_response, ParseError, ParsedResponse};
pub use playlist::{export_playlists, PlaylistOptions, PlaylistReport};
pub use prompt::build_analysis_prompt;
pub use selector::{find_by_identity, find_first_untagged};
pub use status::{collection_status, StatusReport};
pub use updater::apply_result;
pub use workflow::TaggingWorkflow;
