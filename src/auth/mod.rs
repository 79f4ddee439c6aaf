pub mod authority;
pub mod codec;

pub use authority::{AuthError, CurrentUser, Identity, IssuedTokens, TokenAuthority};
pub use codec::{Claims, TokenCodec, TokenError, TokenKind};
