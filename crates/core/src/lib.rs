pub mod naming;
pub mod policy;
pub mod query;
pub mod record;
pub mod size;
pub mod stats;

pub use naming::{file_extension, generate_unique_filename, mime_for_extension};
pub use policy::{
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILES, MAX_DESCRIPTION_CHARS,
    PolicyViolation, UploadPolicy, is_inline_viewable,
};
pub use query::{FilePage, FileQuery, ParseSortFieldError, SortField, SortOrder};
pub use record::{DEFAULT_URL_PREFIX, FileRecord, parse_tags};
pub use size::format_file_size;
pub use stats::{DEFAULT_POPULAR_LIMIT, FileStats, OverallStats, PopularFile, TypeBreakdown};
