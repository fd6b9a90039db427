use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tubetown::{
    chunk_transcript, records, store::TranscriptIndex, transcript, Batcher, BpeTokenizer,
    ChunkRecord, EmbeddedRecord, EmbeddingClient, TokenBudget, CHUNK_TOKEN_LIMIT,
    OVERLAP_TOKEN_LIMIT,
};

#[derive(Parser)]
#[command(
    name = "tubetown",
    version,
    about = "YouTube transcript chunking, embedding, and indexing pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cut each transcript in a directory into token-bounded chunks
    Chunk {
        /// Directory of per-video transcript JSON files
        input_dir: PathBuf,
        /// Directory for the chunked per-video JSON files
        output_dir: PathBuf,
        #[arg(long, default_value_t = CHUNK_TOKEN_LIMIT)]
        chunk_tokens: usize,
        #[arg(long, default_value_t = OVERLAP_TOKEN_LIMIT)]
        overlap_tokens: usize,
        /// Model whose vocabulary sizes the chunks
        #[arg(long, default_value = "gpt-3.5-turbo")]
        model: String,
    },
    /// Flatten chunked videos into one JSON Lines file of records
    Lines {
        /// Directory of chunked per-video JSON files
        input_dir: PathBuf,
        /// Output JSON Lines file
        output_file: PathBuf,
    },
    /// Attach embeddings to each record via an embeddings endpoint
    Embed {
        /// JSON Lines file of chunk records
        input_file: PathBuf,
        /// Output JSON Lines file of embedded records
        output_file: PathBuf,
        #[arg(long, default_value = "https://api.openai.com/v1")]
        endpoint: String,
        #[arg(long, default_value = "text-embedding-ada-002")]
        model: String,
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
    },
    /// Load embedded records into a local SQLite index
    Index {
        /// JSON Lines file of embedded records
        input_file: PathBuf,
        /// Path of the SQLite index database
        db_path: PathBuf,
        /// Model the embeddings were generated with
        #[arg(long, default_value = "text-embedding-ada-002")]
        model: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Chunk {
            input_dir,
            output_dir,
            chunk_tokens,
            overlap_tokens,
            model,
        } => run_chunk(&input_dir, &output_dir, chunk_tokens, overlap_tokens, &model),
        Command::Lines {
            input_dir,
            output_file,
        } => run_lines(&input_dir, &output_file),
        Command::Embed {
            input_file,
            output_file,
            endpoint,
            model,
            batch_size,
        } => run_embed(&input_file, &output_file, &endpoint, &model, batch_size),
        Command::Index {
            input_file,
            db_path,
            model,
        } => run_index(&input_file, &db_path, &model),
    }
}

fn run_chunk(
    input_dir: &Path,
    output_dir: &Path,
    chunk_tokens: usize,
    overlap_tokens: usize,
    model: &str,
) -> Result<()> {
    let budget = TokenBudget {
        chunk_tokens,
        overlap_tokens,
    };
    let tokenizer =
        BpeTokenizer::for_model(model).context(format!("Failed to load vocabulary for {model}"))?;

    fs::create_dir_all(output_dir)
        .context(format!("Failed to create {}", output_dir.display()))?;

    let videos = transcript::load_dir(input_dir)?;
    info!("Chunking {} transcripts from {}", videos.len(), input_dir.display());

    let mut total_chunks = 0;
    for (path, mut video) in videos {
        video.normalize();
        video.chunks = chunk_transcript(&video.transcript, &tokenizer, budget)
            .context(format!("Failed to chunk {}", path.display()))?;
        total_chunks += video.chunks.len();

        let file_name = path
            .file_name()
            .context("Transcript path has no file name")?;
        let out_path = output_dir.join(file_name);
        let out = File::create(&out_path)
            .context(format!("Failed to create {}", out_path.display()))?;
        let mut writer = BufWriter::new(out);
        serde_json::to_writer_pretty(&mut writer, &video)
            .context(format!("Failed to write {}", out_path.display()))?;
        writer.flush()?;
    }

    info!("Wrote {total_chunks} chunks to {}", output_dir.display());
    Ok(())
}

fn run_lines(input_dir: &Path, output_file: &Path) -> Result<()> {
    let videos = transcript::load_dir(input_dir)?;

    let out = File::create(output_file)
        .context(format!("Failed to create {}", output_file.display()))?;
    let mut writer = BufWriter::new(out);

    let mut total = 0;
    for (path, video) in videos {
        let video_records = records::to_records(&video)
            .context(format!("Failed to build records from {}", path.display()))?;
        records::write_lines(&mut writer, &video_records)?;
        total += video_records.len();
    }
    writer.flush()?;

    info!("Wrote {total} records to {}", output_file.display());
    Ok(())
}

fn run_embed(
    input_file: &Path,
    output_file: &Path,
    endpoint: &str,
    model: &str,
    batch_size: usize,
) -> Result<()> {
    let mut client = EmbeddingClient::new(endpoint, model);
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) => client = client.with_api_key(key),
        Err(_) => warn!("OPENAI_API_KEY is not set; sending unauthenticated requests"),
    }

    let chunk_records = read_lines::<ChunkRecord>(input_file)?;
    info!("Embedding {} records with {model}", chunk_records.len());

    let out = File::create(output_file)
        .context(format!("Failed to create {}", output_file.display()))?;
    let mut writer = BufWriter::new(out);

    let batcher = Batcher::new(batch_size);
    let mut embedded = 0;
    for batch in batcher.split(&chunk_records) {
        let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
        let embeddings = client
            .embed_blocking(texts)
            .context("Embedding request failed")?;

        for (record, embedding) in batch.iter().zip(embeddings) {
            let embedded_record = EmbeddedRecord {
                id: record.id.clone(),
                text: record.text.clone(),
                embedding,
                metadata: record.metadata.clone(),
            };
            serde_json::to_writer(&mut writer, &embedded_record)
                .context("Failed to serialize embedded record")?;
            writer.write_all(b"\n")?;
        }

        embedded += batch.len();
        info!("Embedded {embedded}/{} records", chunk_records.len());
    }
    writer.flush()?;

    Ok(())
}

fn run_index(input_file: &Path, db_path: &Path, model: &str) -> Result<()> {
    const INSERT_BATCH_SIZE: usize = 1000;

    let embedded_records = read_lines::<EmbeddedRecord>(input_file)?;
    let db_path_str = db_path
        .to_str()
        .context("Index database path is not valid UTF-8")?;
    let mut index = TranscriptIndex::open(db_path_str)?;

    for batch in embedded_records.chunks(INSERT_BATCH_SIZE) {
        index.insert_batch(batch, model)?;
    }

    let stats = index.get_stats()?;
    info!(
        "Index now holds {} chunks ({} embeddings) across {} videos",
        stats.chunk_count, stats.embedding_count, stats.video_count
    );
    Ok(())
}

fn read_lines<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut items = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.context(format!("Failed to read line {} of {}", idx + 1, path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line)
            .context(format!("Failed to parse line {} of {}", idx + 1, path.display()))?;
        items.push(item);
    }

    Ok(items)
}
