use awesome_sound::app_core::{AppCore, AppPaths};
use awesome_sound::config::Language;
use awesome_sound::library::Order;
use awesome_sound::player::{MediaEngine, RodioEngine};
use awesome_sound::search::{self, SearchSite};
use awesome_sound::track::{self, TrackInfo};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "awesomesound", about = "Music player with synced lyrics", version)]
struct Cli {
    /// Data directory holding songs, lyrics, settings and logs
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show player status
    Status,
    /// List the songs in playlist order
    List,
    /// Play from the current song, printing lyrics as they come up
    Play {
        /// Stop after this many seconds (default: end of the current song)
        #[arg(short, long, value_parser = parse_secs)]
        seconds: Option<Duration>,
        /// Start this many seconds into the song instead of the saved position
        #[arg(long, value_parser = parse_secs)]
        from: Option<Duration>,
    },
    /// Move to the next song
    Next,
    /// Move to the previous song
    Prev,
    /// Jump to a song (1-based)
    Pick { number: usize },
    /// Set the volume (0 - 100)
    Volume { volume: i64 },
    /// Toggle mute
    Mute,
    /// Set the lyrics delay of the current song in seconds
    Delay { seconds: String },
    /// Lyrics of the current song
    Lyrics {
        #[command(subcommand)]
        action: LyricsCmd,
    },
    /// Copy audio files into the library
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Delete the current song
    Delete,
    /// Rename the current song (extension kept)
    Rename { name: String },
    /// Copy the current song to the download directory
    Export,
    /// Reorder the playlist: shuffle, alphabetical, length, length-desc, original
    Order { mode: Order },
    /// Cut [start, stop) seconds of the current song into a new song
    Trim {
        #[arg(value_parser = parse_secs)]
        start: Duration,
        #[arg(value_parser = parse_secs)]
        stop: Duration,
    },
    /// Print a web search link for the current song
    Search { site: SearchSite },
    /// Player settings
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
    /// Activity log
    Logs {
        #[command(subcommand)]
        action: LogsCmd,
    },
}

#[derive(Subcommand)]
enum LyricsCmd {
    /// Print the lyric lines
    Show,
    /// Append a line shown from START to STOP seconds
    Add {
        text: String,
        #[arg(value_parser = parse_secs)]
        start: Duration,
        #[arg(value_parser = parse_secs)]
        stop: Duration,
    },
    /// Use an .srt file as the lyrics
    Import { file: PathBuf },
    /// Remove the lyrics and their delay
    Delete,
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Show current settings
    Show,
    /// Set the interface language (en, gr)
    Language { language: Language },
    /// Set the lyrics refresh rate (10 - 120)
    FrameRate { frames: u32 },
    /// Set the export/trim destination
    DownloadDir { path: PathBuf },
    /// Reset every setting, lyric delays included
    Restore,
}

#[derive(Subcommand)]
enum LogsCmd {
    /// Print the activity log
    Show,
    /// Empty the activity log
    Clear,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli.root.clone().unwrap_or_else(AppPaths::default_root);
    let mut core = match AppCore::open(AppPaths::under(&root)) {
        Ok(core) => core,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&mut core, cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// A non-negative number of seconds that fits a `Duration`.
fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.trim().parse().map_err(|_| format!("'{}' is not a number", s))?;
    if secs < 0.0 {
        return Err(format!("{} is negative", secs));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| format!("{} is not a usable time", s))
}

fn print_current(core: &AppCore) {
    let pl = core.player.playlist();
    match pl.current() {
        Some(song) => println!(
            "[{}/{}] {}",
            pl.current_index() + 1,
            pl.len(),
            track::song_name(song)
        ),
        None => println!("No songs. Use 'import <files..>' first."),
    }
}

fn run(core: &mut AppCore, command: Commands) -> awesome_sound::Result<()> {
    match command {
        Commands::Status => {
            let s = core.status()?;
            println!("awesomesound v{}", env!("CARGO_PKG_VERSION"));
            print_current(core);
            println!(
                "Volume: {}{} | Lyrics: {} ({} line(s), delay {}s) | Language: {} | Frame rate: {}",
                s.volume,
                if s.is_muted { " (muted)" } else { "" },
                s.lyrics_file.as_deref().unwrap_or("none"),
                s.lyric_lines,
                s.lyrics_delay_secs,
                s.language.code(),
                s.max_frame_rate
            );
            println!("Download dir: {}", s.download_dir);
        }
        Commands::List => {
            let pl = core.player.playlist();
            if pl.is_empty() {
                println!("No songs in '{}'.", core.paths.songs_dir.display());
            }
            for (i, song) in pl.iter().enumerate() {
                let marker = if i == pl.current_index() { ">" } else { " " };
                match TrackInfo::from_path(&core.paths.songs_dir, song) {
                    Ok(info) => println!(
                        "{} {:>3}. {} [{}]",
                        marker,
                        i + 1,
                        info.label(),
                        info.duration_display()
                    ),
                    Err(_) => println!("{} {:>3}. {}", marker, i + 1, track::song_name(song)),
                }
            }
        }
        Commands::Play { seconds, from } => play(core, seconds, from)?,
        Commands::Next => {
            core.next_song()?;
            core.save_session(Duration::ZERO)?;
            print_current(core);
        }
        Commands::Prev => {
            core.prev_song()?;
            core.save_session(Duration::ZERO)?;
            print_current(core);
        }
        Commands::Pick { number } => {
            core.pick_song(number as isize - 1)?;
            core.save_session(Duration::ZERO)?;
            print_current(core);
        }
        Commands::Volume { volume } => {
            let v = core.set_volume(volume)?;
            println!("Volume: {}", v);
        }
        Commands::Mute => {
            let muted = core.toggle_mute()?;
            println!("{}", if muted { "Muted" } else { "Unmuted" });
        }
        Commands::Delay { seconds } => match core.set_lyrics_delay(&seconds)? {
            Some(d) => println!("Lyrics delay: {}s", d),
            None => println!(
                "Ignored '{}'; lyrics delay stays {}s",
                seconds,
                core.current_delay()
            ),
        },
        Commands::Lyrics { action } => match action {
            LyricsCmd::Show => {
                if core.lyrics().is_empty() {
                    println!("No lyrics for this song.");
                }
                for line in core.lyrics().lines() {
                    println!(
                        "{} --> {}  {}",
                        awesome_sound::lyrics::format_timestamp(line.start),
                        awesome_sound::lyrics::format_timestamp(line.end),
                        line.text
                    );
                }
            }
            LyricsCmd::Add { text, start, stop } => {
                let index = core.write_lyric_line(&text, start, stop)?;
                println!("Wrote line {}", index);
            }
            LyricsCmd::Import { file } => {
                let dest = core.import_lyrics(&file)?;
                println!("Lyrics saved to {}", dest.display());
            }
            LyricsCmd::Delete => {
                if core.delete_lyrics()? {
                    println!("Lyrics deleted.");
                } else {
                    println!("No lyrics to delete.");
                }
            }
        },
        Commands::Import { files } => {
            let imported = core.import_songs(&files)?;
            println!("Imported {} song(s).", imported.len());
        }
        Commands::Delete => {
            let song = core.delete_song()?;
            println!("Deleted '{}'.", track::song_name(&song));
            print_current(core);
        }
        Commands::Rename { name } => {
            let new_name = core.rename_song(&name)?;
            println!("Renamed to '{}'.", new_name);
        }
        Commands::Export => {
            let out = core.export_song()?;
            println!("Exported to {}", out.display());
        }
        Commands::Order { mode } => {
            core.order_by(mode)?;
            print_current(core);
        }
        Commands::Trim { start, stop } => {
            let name = core.trim(start, stop)?;
            println!("Created '{}'.", name);
        }
        Commands::Search { site } => {
            let name = core.player.playlist().song_name().unwrap_or_default();
            println!("{}", search::search_url(site, name));
        }
        Commands::Config { action } => match action {
            ConfigCmd::Show => {
                let map = core.config.read()?;
                let text = serde_json::to_string_pretty(&map).unwrap_or_default();
                println!("{}", text);
            }
            ConfigCmd::Language { language } => {
                core.set_language(language)?;
                println!("Language: {}", language.code());
            }
            ConfigCmd::FrameRate { frames } => {
                core.set_max_frame_rate(frames)?;
                println!("Max frame rate: {}", frames);
            }
            ConfigCmd::DownloadDir { path } => {
                core.set_download_dir(&path)?;
                println!("Download dir: {}", path.display());
            }
            ConfigCmd::Restore => {
                core.restore_settings()?;
                println!("Settings restored.");
            }
        },
        Commands::Logs { action } => match action {
            LogsCmd::Show => print!("{}", core.logs.read_file()?),
            LogsCmd::Clear => {
                core.clear_logs()?;
                println!("Log cleared.");
            }
        },
    }
    Ok(())
}

/// Play through rodio, ticking at the configured frame rate.
fn play(
    core: &mut AppCore,
    limit: Option<Duration>,
    from: Option<Duration>,
) -> awesome_sound::Result<()> {
    let mut engine = RodioEngine::new()?;
    if !core.player.is_playing() {
        core.toggle_play();
    }
    core.load_into(&mut engine)?;
    let start = match from {
        Some(pos) => Some(pos),
        None => core.resume_position()?,
    };
    if let Some(pos) = start.filter(|p| !p.is_zero()) {
        let step = pos.as_secs_f64();
        if let Err(e) = core.step(&mut engine, step) {
            tracing::warn!("cannot start at {:?}: {}", pos, e);
        }
    }
    print_current(core);

    let interval = core.tick_interval()?;
    let started = Instant::now();
    let mut shown: Option<String> = None;

    loop {
        if limit.is_some_and(|l| started.elapsed() >= l) {
            break;
        }
        if limit.is_none() && engine.is_finished() {
            break;
        }
        let tick = core.tick(&mut engine)?;
        if tick.song_changed {
            print_current(core);
        }
        if tick.line != shown {
            if let Some(line) = &tick.line {
                println!("  {}", line);
            }
            shown = tick.line;
        }
        std::thread::sleep(interval);
    }

    core.save_session(engine.elapsed())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_secs_accepts_positions() {
        assert_eq!(parse_secs("1.5"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_secs(" 0 "), Ok(Duration::ZERO));
    }

    #[test]
    fn parse_secs_rejects_unusable_times() {
        for input in ["inf", "NaN", "-1", "1e300", "soon"] {
            assert!(parse_secs(input).is_err(), "{input} accepted");
        }
    }
}
