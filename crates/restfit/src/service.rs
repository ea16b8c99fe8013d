use crate::client::Client;

/// Implemented by every generated `_<Name>Impl`.
///
/// The dispatcher is late-bound: implementations are constructed empty and
/// receive their [`Client`] from [`crate::Restfit::create`]. Implementations
/// of extended interfaces forward the client to their parent delegates.
pub trait RestfitService {
    fn set_client(&mut self, client: Client);
}
