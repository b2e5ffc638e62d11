//! `C2`: the note repository — citekey index, Markdown rendering, and
//! frontmatter parsing for the notes the engine creates and updates.

mod builder;
mod error;
mod frontmatter;
mod repository;

pub use builder::{filename_for_citekey, render_markdown};
pub use error::NoteError;
pub use frontmatter::{extract_summary_block, parse_frontmatter, parse_tags};
pub use repository::NoteRepository;
