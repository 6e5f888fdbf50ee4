use clap::{ArgGroup, Parser, Subcommand};
use folio_media::config::{self, MediaConfig};
use folio_media::gateway::PersistenceGateway;
use folio_media::imaging::{AspectRatio, CropRegion, FilterChannel, RasterCompositor};
use folio_media::library::LibraryController;
use folio_media::output;
use folio_media::storage::{DefaultFetcher, FsObjectStore, JsonRecordStore, StaticIdentity};
use folio_media::types::MediaId;
use std::path::{Path, PathBuf};
use std::time::Duration;

type Library = LibraryController<
    StaticIdentity,
    FsObjectStore,
    JsonRecordStore,
    DefaultFetcher,
    RasterCompositor,
>;

#[derive(Parser)]
#[command(name = "folio-media")]
#[command(about = "Media library for a portfolio blog")]
#[command(long_about = "\
Media library for a portfolio blog

Images are stored per owner in a bucket directory and listed from a media
table. Edits (crop, resize, brightness/contrast/saturation) are rendered to
JPEG and either saved as a new library item or downloaded to a file. The
original image is never modified.

Storage layout:

  .folio-media/
  ├── media.json                       # Media table
  └── blog-images/                     # Bucket
      └── <owner>/
          └── 1767225600000-3f9a1c0e.jpg

Run 'folio-media gen-config' to generate a documented folio-media.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Act as this owner (overrides [identity].owner)
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List library images, newest first
    List {
        /// Only show images whose name contains this text
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Show an image's details and dimensions
    Info { id: String },
    /// Upload image files
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Add an external image by URL
    AddUrl { url: String },
    /// Crop, resize or filter an image, then save or download the result
    Edit(EditArgs),
    /// Delete images (and their stored files)
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print a stock folio-media.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
#[command(group(ArgGroup::new("result").required(true).args(["save", "download"])))]
struct EditArgs {
    id: String,

    /// Crop region in percent of the image: x,y,width,height
    #[arg(long, value_parser = parse_crop)]
    crop: Option<CropRegion>,

    /// Aspect ratio preset, e.g. 16:9 (centers an 80% crop)
    #[arg(long)]
    aspect: Option<AspectRatio>,

    /// Resize to this percent of the cropped size (10-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(10..=100))]
    scale: Option<u32>,

    /// Brightness in percent (0-200, 100 = unchanged)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=200))]
    brightness: Option<u32>,

    /// Contrast in percent (0-200, 100 = unchanged)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=200))]
    contrast: Option<u32>,

    /// Saturation in percent (0-200, 100 = unchanged)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=200))]
    saturation: Option<u32>,

    /// Store the result as a new library image
    #[arg(long)]
    save: bool,

    /// Write the result to this file or directory instead
    #[arg(long)]
    download: Option<PathBuf>,
}

fn parse_crop(s: &str) -> Result<CropRegion, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid crop {s:?}: {e}"))?;
    match parts.as_slice() {
        [x, y, width, height] => Ok(CropRegion::percent(*x, *y, *width, *height)),
        _ => Err(format!("crop needs four values x,y,width,height, got {s:?}")),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut config = config::load_config(&cli.config)?;
    if let Some(owner) = cli.owner {
        config.identity.owner = owner;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli.command, &config))
}

fn open_library(config: &MediaConfig) -> Result<Library, Box<dyn std::error::Error>> {
    let gateway = PersistenceGateway::new(
        StaticIdentity::from_config(&config.identity.owner),
        FsObjectStore::new(config.storage.bucket_dir(), &config.storage.public_base_url),
        JsonRecordStore::new(config.storage.records_path()),
        config.uploads.max_bytes,
    );
    let fetcher = DefaultFetcher::new(Duration::from_secs(config.fetch.timeout_secs))?;
    Ok(LibraryController::new(
        gateway,
        fetcher,
        RasterCompositor::new(),
    ))
}

async fn run(command: Command, config: &MediaConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut library = open_library(config)?;
    library.reload().await?;

    match command {
        Command::List { search } => {
            library.set_search(&search);
            output::print_library(&library.visible_items(), library.search());
        }
        Command::Info { id } => {
            library.open_and_probe(&MediaId(id)).await?;
            if let Some(session) = library.preview() {
                output::print_item_info(&session.item, session.metadata.as_ref());
            }
        }
        Command::Upload { files } => {
            let mut payload = Vec::with_capacity(files.len());
            for path in &files {
                let bytes = tokio::fs::read(path).await?;
                payload.push((display_name(path), bytes));
            }
            let report = library.upload_files(payload).await?;
            // The report already lists every file.
            library.take_notices();
            output::print_upload_report(&report);
        }
        Command::AddUrl { url } => {
            let item = library.add_by_url(&url).await?;
            println!("Added {} (id {})", item.name, item.id);
        }
        Command::Edit(args) => edit(&mut library, args).await?,
        Command::Delete { ids } => {
            let ids: Vec<MediaId> = ids.into_iter().map(MediaId).collect();
            let report = library.bulk_delete(&ids).await?;
            output::print_bulk_report(&report);
        }
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }

    output::print_notices(&library.take_notices());
    Ok(())
}

async fn edit(library: &mut Library, args: EditArgs) -> Result<(), Box<dyn std::error::Error>> {
    library.open_and_probe(&MediaId(args.id)).await?;

    if args.crop.is_some() || args.aspect.is_some() {
        library.toggle_crop()?;
    }
    if let Some(aspect) = args.aspect {
        library.set_aspect(Some(aspect))?;
    }
    if let Some(crop) = args.crop {
        library.adjust_crop(crop)?;
    }
    if let Some(scale) = args.scale {
        library.set_resize_scale(scale)?;
    }
    for (channel, value) in [
        (FilterChannel::Brightness, args.brightness),
        (FilterChannel::Contrast, args.contrast),
        (FilterChannel::Saturation, args.saturation),
    ] {
        if let Some(value) = value {
            library.set_filter(channel, value)?;
        }
    }

    if let Some(session) = library.preview() {
        output::print_edit_summary(session);
    }

    if args.save {
        let item = library.save().await?;
        println!("Saved {} → {}", item.name, item.url);
    } else if let Some(target) = args.download {
        let downloaded = library.download().await?;
        let path = if target.is_dir() {
            target.join(&downloaded.file_name)
        } else {
            target
        };
        tokio::fs::write(&path, &downloaded.image.bytes).await?;
        println!(
            "Wrote {} ({}×{})",
            path.display(),
            downloaded.image.dimensions.width,
            downloaded.image.dimensions.height
        );
    }
    Ok(())
}

/// File name used as the display name of an uploaded file.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
