/// Which PPS/10 MHz reference devices should lock to.
///
/// `Auto` elects a source based on membership: a single device is its own
/// reference (`Internal`); two or more require a shared external reference
/// (`External`). `Internal` with more than one device is a configuration
/// error (`SyncUnsupported`); `External` is always honored regardless of
/// membership.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncSourcePolicy {
    #[default]
    Auto,
    Internal,
    External,
}
