use anyhow::{Context, Result};
use annotation_session::{AnnotationSession, EditAction, SaveOutcome, SessionPhase};
use clap::{Parser, Subcommand};
use doc_model::{DocumentRecord, DocumentRegistry, FileType, Position, Shape, ShapeKind, Size};
use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;
use std::rc::Rc;
use storage::Storage;
use viewer_core::{HeadlessSurface, ResizeEvents};

#[derive(Debug, Parser)]
#[command(name = "docnote")]
#[command(about = "Annotate documents and keep review notes per document")]
pub struct Cli {
    /// Directory holding the document list and saved annotations.
    #[arg(long, global = true, env = "DOCNOTE_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the document list as JSON.
    List,
    /// Add a document to the list.
    Import {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        uri: String,
        #[arg(long)]
        file_type: FileType,
        #[arg(long)]
        assign: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Print a document with its annotations as JSON.
    Show {
        #[arg(value_name = "ID")]
        id: String,
        /// Rendered content height reported by the viewer, in pixels.
        #[arg(long)]
        height: Option<f32>,
    },
    /// Edit a document's annotations and save them.
    Annotate {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long)]
        assign: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// Shape to append, e.g. `square:10,20,100,50:label`.
        #[arg(long = "shape", value_name = "KIND:X,Y,W,H[:TEXT]", value_parser = parse_shape)]
        shapes: Vec<Shape>,
        /// Index of a saved shape to remove. May be repeated.
        #[arg(long = "remove-shape", value_name = "INDEX")]
        remove_shapes: Vec<usize>,
        #[arg(long)]
        clear_shapes: bool,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    document: &'a DocumentRecord,
    shapes: &'a [Shape],
    comment: &'a str,
    assign: &'a str,
    status: &'a str,
    overlay: String,
}

struct Edits {
    comment: Option<String>,
    assign: Option<String>,
    status: Option<String>,
    shapes: Vec<Shape>,
    remove_shapes: Vec<usize>,
    clear_shapes: bool,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    if let Commands::Version = cli.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let storage = match cli.data_dir {
        Some(root) => Storage::with_root(root),
        None => Storage::from_default_project().context("failed to locate data directory")?,
    };
    tracing::debug!(root = %storage.root().display(), "using data directory");

    match cli.command {
        Commands::List => run_list(&storage),
        Commands::Import { id, name, uri, file_type, assign, status } => {
            let record =
                DocumentRecord { assign, status, ..DocumentRecord::new(id, name, uri, file_type) };
            run_import(&storage, record)
        }
        Commands::Show { id, height } => run_show(storage, &id, height),
        Commands::Annotate { id, comment, assign, status, shapes, remove_shapes, clear_shapes } => {
            let edits = Edits { comment, assign, status, shapes, remove_shapes, clear_shapes };
            run_annotate(storage, &id, edits)
        }
        Commands::Version => Ok(()),
    }
}

fn load_registry(storage: &Storage) -> Result<DocumentRegistry> {
    let documents = storage.load_documents().context("failed to read document list")?;
    DocumentRegistry::new(documents).context("document list is inconsistent")
}

fn open_session(
    storage: Storage,
    id: &str,
    height: Option<f32>,
) -> Result<AnnotationSession<Storage>> {
    let registry = load_registry(&storage)?;
    let surface = Rc::new(HeadlessSurface::new(height));
    let mut session = AnnotationSession::new(registry, storage, ResizeEvents::new(), surface);

    let phase = session.open(id).context("failed to load annotations")?;
    if phase == SessionPhase::NotFound {
        anyhow::bail!("document not found: {id}");
    }

    Ok(session)
}

fn run_list(storage: &Storage) -> Result<()> {
    let registry = load_registry(storage)?;
    let json = serde_json::to_string_pretty(&*registry.list())?;
    println!("{json}");
    Ok(())
}

fn run_import(storage: &Storage, record: DocumentRecord) -> Result<()> {
    let registry = load_registry(storage)?;
    let mut documents = registry.list().to_vec();
    let id = record.id.clone();
    documents.push(record);

    registry.replace_all(documents).context("failed to import document")?;
    storage.save_documents(&registry.list()).context("failed to write document list")?;

    println!("imported {id}");
    Ok(())
}

fn run_show(storage: Storage, id: &str, height: Option<f32>) -> Result<()> {
    let session = open_session(storage, id, height)?;
    let document = session.document().context("document not loaded")?;

    let payload = ShowOutput {
        document,
        shapes: session.shapes(),
        comment: session.comment(),
        assign: session.assign(),
        status: session.status(),
        overlay: session.overlay_height().to_string(),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");
    Ok(())
}

fn run_annotate(storage: Storage, id: &str, edits: Edits) -> Result<()> {
    let mut session = open_session(storage, id, None)?;

    if edits.clear_shapes {
        session.apply(EditAction::ClearShapes)?;
    }

    // Highest index first so each index still refers to the loaded order.
    let mut remove_shapes = edits.remove_shapes;
    remove_shapes.sort_unstable_by(|a, b| b.cmp(a));
    remove_shapes.dedup();
    for index in remove_shapes {
        session.apply(EditAction::RemoveShape { index })?;
    }

    for shape in edits.shapes {
        session.apply(EditAction::AddShape(shape))?;
    }
    if let Some(comment) = edits.comment {
        session.apply(EditAction::SetComment(comment))?;
    }
    if let Some(assign) = edits.assign {
        session.apply(EditAction::SetAssign(assign))?;
    }
    if let Some(status) = edits.status {
        session.apply(EditAction::SetStatus(status))?;
    }

    let outcome = session.save().context("failed to save annotations")?;
    if outcome == SaveOutcome::Saved {
        session
            .store()
            .save_documents(&session.registry().list())
            .context("failed to write document list")?;
    }

    println!("{outcome}");
    Ok(())
}

fn parse_shape(value: &str) -> Result<Shape, String> {
    let mut parts = value.splitn(3, ':');
    let kind: ShapeKind = parts.next().unwrap_or_default().parse()?;
    let geometry = parts.next().ok_or_else(|| format!("missing geometry in `{value}`"))?;
    let text = parts.next().unwrap_or_default();

    let numbers = geometry
        .split(',')
        .map(|number| number.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| format!("invalid geometry `{geometry}`: {error}"))?;

    let &[x, y, width, height] = numbers.as_slice() else {
        return Err(format!("expected X,Y,W,H in `{geometry}`"));
    };

    Ok(Shape::new(kind, Position { x, y }, Size { width, height }).with_text(text))
}
