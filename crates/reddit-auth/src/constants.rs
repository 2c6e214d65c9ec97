//! Reddit OAuth endpoints and client identification
//!
//! These are the production defaults. Configuration may override any of
//! them, which is how tests point the client at local mock servers.

/// Token endpoint for the password grant
pub const TOKEN_ENDPOINT: &str = "https://www.reddit.com/api/v1/access_token";

/// Base URL for bearer-authenticated API calls
pub const API_BASE: &str = "https://oauth.reddit.com";

/// Reddit rejects requests without a descriptive User-Agent
pub const DEFAULT_USER_AGENT: &str = "ChangeMeClient/0.1 by avilay";

/// Subreddit polled when none is configured
pub const DEFAULT_SUBREDDIT: &str = "GetMotivated";
