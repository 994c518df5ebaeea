//! The segment-type registry: maps `(marker, optional identifier)` to a
//! factory that constructs an empty instance of the concrete segment
//! type, replacing the reflection-driven lookup of the source system
//! with an explicit, compile-time-populated table (see
//! `SPEC_FULL.md` REDESIGN FLAGS).

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};
use crate::key::SegmentKeyTemplate;
use crate::markers;
use crate::segments::{
    self, ExifApp1, ExtendedXmpApp1, GenericSegment, JfifApp0, JfxxApp0, Segment, SosSegment,
    XmpApp1,
};

type Factory = fn() -> Segment;

/// A single registration: the key template the type self-describes with,
/// plus the no-argument constructor used by the reader when that key is
/// encountered on the wire.
#[derive(Clone, Copy)]
pub struct RegistryEntry {
    pub template: SegmentKeyTemplate,
    pub factory: Factory,
}

/// Maps markers (and, where relevant, their body-identifier strings) to
/// segment factories. Mutable until [`Self::freeze`]s itself into a
/// shareable `Arc`; after that, further registration fails.
pub struct SegmentRegistry {
    no_identifier: HashMap<u8, Factory>,
    identifier: HashMap<u8, HashMap<String, Factory>>,
    frozen: bool,
}

impl SegmentRegistry {
    pub fn new() -> Self {
        Self {
            no_identifier: HashMap::new(),
            identifier: HashMap::new(),
            frozen: false,
        }
    }

    /// The crate's default registry: every built-in segment type listed
    /// in `SPEC_FULL.md` §3, shared behind an `Arc` once frozen.
    pub fn default_registry() -> Arc<SegmentRegistry> {
        static DEFAULT: OnceLock<Arc<SegmentRegistry>> = OnceLock::new();
        DEFAULT
            .get_or_init(|| {
                let mut registry = SegmentRegistry::new();
                registry
                    .register(RegistryEntry {
                        template: segments::SOI_TEMPLATE,
                        factory: || Segment::Soi,
                    })
                    .expect("built-in registration");
                registry
                    .register(RegistryEntry {
                        template: segments::EOI_TEMPLATE,
                        factory: || Segment::Eoi,
                    })
                    .expect("built-in registration");
                registry
                    .register(RegistryEntry {
                        template: JfifApp0::TEMPLATE,
                        factory: || Segment::JfifApp0(JfifApp0::default()),
                    })
                    .expect("built-in registration");
                registry
                    .register(RegistryEntry {
                        template: JfxxApp0::TEMPLATE,
                        factory: || {
                            Segment::JfxxApp0(JfxxApp0 {
                                thumbnail: segments::JfxxThumbnail::Rgb {
                                    width: 0,
                                    height: 0,
                                    data: Vec::new(),
                                },
                            })
                        },
                    })
                    .expect("built-in registration");
                registry
                    .register(RegistryEntry {
                        template: ExifApp1::TEMPLATE,
                        factory: || Segment::ExifApp1(ExifApp1::default()),
                    })
                    .expect("built-in registration");
                registry
                    .register(RegistryEntry {
                        template: XmpApp1::TEMPLATE,
                        factory: || Segment::XmpApp1(XmpApp1::default()),
                    })
                    .expect("built-in registration");
                registry
                    .register(RegistryEntry {
                        template: ExtendedXmpApp1::TEMPLATE,
                        factory: || Segment::ExtendedXmpApp1(ExtendedXmpApp1::default()),
                    })
                    .expect("built-in registration");
                registry
                    .register(RegistryEntry {
                        template: SosSegment::TEMPLATE,
                        factory: || Segment::Sos(SosSegment::default()),
                    })
                    .expect("built-in registration");
                registry.freeze();
                Arc::new(registry)
            })
            .clone()
    }

    /// Register a segment type, failing on a conflicting duplicate.
    pub fn register(&mut self, entry: RegistryEntry) -> Result<()> {
        self.register_impl(entry, false)
    }

    /// Register a segment type, replacing any existing mapping at the
    /// same key.
    pub fn register_with_override(&mut self, entry: RegistryEntry) -> Result<()> {
        self.register_impl(entry, true)
    }

    fn register_impl(&mut self, entry: RegistryEntry, allow_override: bool) -> Result<()> {
        if self.frozen {
            return Err(Error::ShapeMismatch {
                reason: "segment registry is frozen; no further registration is allowed"
                    .to_string(),
            });
        }
        let marker = entry.template.marker;
        match entry.template.identifier {
            None => {
                if !allow_override {
                    if self.no_identifier.contains_key(&marker) {
                        return Err(Error::ShapeMismatch {
                            reason: format!(
                                "marker {marker:#04x} already has a no-identifier mapping"
                            ),
                        });
                    }
                    if self.identifier.contains_key(&marker) {
                        return Err(Error::ShapeMismatch {
                            reason: format!(
                                "marker {marker:#04x} already hosts identifier mappings; it cannot also host a no-identifier mapping"
                            ),
                        });
                    }
                }
                self.no_identifier.insert(marker, entry.factory);
            }
            Some(identifier) => {
                if !allow_override && self.no_identifier.contains_key(&marker) {
                    return Err(Error::ShapeMismatch {
                        reason: format!(
                            "marker {marker:#04x} already has a no-identifier mapping; it cannot also host identifier mappings"
                        ),
                    });
                }
                let by_identifier = self.identifier.entry(marker).or_default();
                if !allow_override && by_identifier.contains_key(identifier) {
                    return Err(Error::ShapeMismatch {
                        reason: format!(
                            "marker {marker:#04x} identifier {identifier:?} is already registered"
                        ),
                    });
                }
                by_identifier.insert(identifier.to_string(), entry.factory);
            }
        }
        Ok(())
    }

    /// Freezes the registry in place; subsequent `register*` calls fail.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn lookup_no_identifier(&self, marker: u8) -> Option<Segment> {
        self.no_identifier.get(&marker).map(|factory| factory())
    }

    pub fn lookup_identifier(&self, marker: u8, identifier: &str) -> Option<Segment> {
        self.identifier
            .get(&marker)
            .and_then(|by_identifier| by_identifier.get(identifier))
            .map(|factory| factory())
    }

    pub fn has_identifier(&self, marker: u8) -> bool {
        self.identifier
            .get(&marker)
            .map(|by_identifier| !by_identifier.is_empty())
            .unwrap_or(false)
    }
}

impl Default for SegmentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
