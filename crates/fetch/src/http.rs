//! Streaming HTTP downloads

use crate::config::FetcherConfig;
use crate::error::FetchError;
use std::io::{self, BufReader, BufWriter, Write};

/// Buffer size for copying response bodies into cache editors
pub const IO_BUFFER_SIZE: usize = 8 * 1024;

/// Build the HTTP agent described by `config`.
///
/// With connection reuse disabled the agent keeps no idle connections, so
/// every request opens a fresh one.
pub fn build_agent(config: &FetcherConfig) -> ureq::Agent {
    let mut builder = ureq::AgentBuilder::new()
        .timeout(config.timeout())
        .user_agent(&config.user_agent);
    if config.disable_connection_reuse {
        builder = builder
            .max_idle_connections(0)
            .max_idle_connections_per_host(0);
    }
    builder.build()
}

/// Download `url` into `writer`, returning the number of body bytes copied.
///
/// Non-success status codes are errors.
pub fn download_to<W: Write>(agent: &ureq::Agent, url: &str, writer: W) -> Result<u64, FetchError> {
    tracing::debug!(url, "downloading image");
    let response = agent.get(url).call()?;

    let mut reader = BufReader::with_capacity(IO_BUFFER_SIZE, response.into_reader());
    let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, writer);
    let copied = io::copy(&mut reader, &mut out)?;
    out.flush()?;
    Ok(copied)
}
