// crates/wpsf-core/src/runtime/tokens.rs
// ============================================================================
// Module: WPSF One-Time Tokens
// Description: In-memory issuance and verification of action-bound tokens.
// Purpose: Protect export and import requests against cross-site forgery.
// Dependencies: crate::interfaces, base64, rand, sha2, subtle
// ============================================================================

//! ## Overview
//! Tokens are 32 random bytes from the OS RNG, base64url-encoded. Only the
//! SHA-256 digest of each token is kept. Verification hashes the presented
//! token, compares digests in constant time, and removes the matching entry,
//! so every token is single-use. Expired entries are pruned on every call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::interfaces::TokenAction;
use crate::interfaces::TokenError;
use crate::interfaces::TokenService;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Maximum outstanding tokens; the oldest are dropped beyond this.
pub const MAX_OUTSTANDING_TOKENS: usize = 1024;

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

// ============================================================================
// SECTION: Token Service
// ============================================================================

/// Outstanding token record.
#[derive(Debug, Clone)]
struct IssuedToken {
    /// Action the token is bound to.
    action: TokenAction,
    /// SHA-256 digest of the token text.
    digest: [u8; 32],
    /// Expiry instant.
    expires_at: Instant,
}

/// In-memory one-time token service.
///
/// # Invariants
/// - Token plaintext is never stored.
/// - A token verifies at most once, for the action it was issued for.
#[derive(Debug)]
pub struct InMemoryTokenService {
    /// Token lifetime.
    ttl: Duration,
    /// Outstanding tokens, oldest first.
    issued: Mutex<Vec<IssuedToken>>,
}

impl Default for InMemoryTokenService {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_TTL)
    }
}

impl InMemoryTokenService {
    /// Creates a service with the given token lifetime.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            issued: Mutex::new(Vec::new()),
        }
    }

    /// Returns the token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl TokenService for InMemoryTokenService {
    fn issue(&self, action: TokenAction) -> Result<String, TokenError> {
        let mut bytes = [0_u8; TOKEN_BYTES];
        OsRng.try_fill_bytes(&mut bytes).map_err(|err| TokenError::Service(err.to_string()))?;
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let now = Instant::now();
        let mut issued =
            self.issued.lock().map_err(|_| TokenError::Service("token store mutex poisoned".to_string()))?;
        issued.retain(|entry| entry.expires_at > now);
        if issued.len() >= MAX_OUTSTANDING_TOKENS {
            let excess = issued.len() + 1 - MAX_OUTSTANDING_TOKENS;
            issued.drain(..excess);
        }
        issued.push(IssuedToken {
            action,
            digest: token_digest(&token),
            expires_at: now + self.ttl,
        });
        Ok(token)
    }

    fn verify(&self, action: TokenAction, token: &str) -> Result<(), TokenError> {
        if token.is_empty() {
            return Err(TokenError::Rejected);
        }
        let digest = token_digest(token);
        let now = Instant::now();
        let mut issued =
            self.issued.lock().map_err(|_| TokenError::Service("token store mutex poisoned".to_string()))?;
        issued.retain(|entry| entry.expires_at > now);
        let position = issued
            .iter()
            .position(|entry| entry.action == action && bool::from(entry.digest.as_slice().ct_eq(digest.as_slice())));
        match position {
            Some(index) => {
                issued.remove(index);
                Ok(())
            }
            None => Err(TokenError::Rejected),
        }
    }
}

/// Returns the SHA-256 digest of a token.
fn token_digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}
