//! Invite code generation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::Rng;

/// Characters used in invite codes. Look-alikes (I, O, 0, 1) are left out.
pub const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const INVITE_CODE_LENGTH: usize = 6;

/// Generate a random invite code.
pub fn generate_invite_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..INVITE_CODE_LENGTH)
        .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

/// Source of candidate invite codes for new operations.
pub trait InviteCodes: Send + Sync {
    fn next_code(&self) -> String;
}

/// Random codes from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomInviteCodes;

impl InviteCodes for RandomInviteCodes {
    fn next_code(&self) -> String {
        generate_invite_code(&mut rand::thread_rng())
    }
}

/// Hands out a fixed list of codes in order, starting over at the end.
#[derive(Debug, Clone)]
pub struct FixedInviteCodes {
    codes: Arc<Vec<String>>,
    next: Arc<AtomicUsize>,
}

impl FixedInviteCodes {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: Arc::new(codes.into_iter().map(Into::into).collect()),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl InviteCodes for FixedInviteCodes {
    fn next_code(&self) -> String {
        if self.codes.is_empty() {
            return RandomInviteCodes.next_code();
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.codes.len();
        self.codes[index].clone()
    }
}
