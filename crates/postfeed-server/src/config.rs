//! Server configuration.

use clap::Parser;
use postfeed_core::config::DEFAULT_CHANNEL_CAPACITY;
use postfeed_core::PubSubConfig;

/// Default HTTP listen address.
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:4000";

/// postfeed server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on for HTTP and WebSocket requests.
    pub listen_addr: String,

    /// Pending events buffered per subscriber.
    pub channel_capacity: usize,

    /// Load the sample users, posts and comments at startup.
    pub seed: bool,

    /// Also publish comment events on the per-post `comment:<postId>` topic.
    pub scoped_comments: bool,
}

impl ServerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDRESS.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            seed: true,
            scoped_comments: true,
        }
    }

    /// Set the listen address.
    pub fn with_listen_addr(mut self, address: impl Into<String>) -> Self {
        self.listen_addr = address.into();
        self
    }

    /// Set the per-subscriber buffer size.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Start with an empty store.
    pub fn without_seed(mut self) -> Self {
        self.seed = false;
        self
    }

    /// Publish comment events on the flat `comment` topic only.
    pub fn without_scoped_comments(mut self) -> Self {
        self.scoped_comments = false;
        self
    }

    /// Pub/sub settings derived from this configuration.
    pub fn pubsub(&self) -> PubSubConfig {
        PubSubConfig::new().with_channel_capacity(self.channel_capacity)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Command-line arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "postfeed-server")]
#[command(version, about = "Blog API with live change subscriptions", long_about = None)]
pub struct Args {
    /// Address to listen on.
    #[arg(short, long, default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen: String,

    /// Pending events buffered per subscriber before new events are dropped.
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Start with an empty store instead of the sample data.
    #[arg(long)]
    pub no_seed: bool,

    /// Publish comment events on the flat `comment` topic only.
    #[arg(long)]
    pub flat_comments: bool,
}

impl Args {
    /// Convert command-line arguments to server configuration.
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.listen,
            channel_capacity: self.channel_capacity.max(1),
            seed: !self.no_seed,
            scoped_comments: !self.flat_comments,
        }
    }
}
