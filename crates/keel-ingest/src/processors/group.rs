use std::collections::BTreeMap;

use tracing::debug;

use keel_types::{Change, ChangeType, EntryKind};

use crate::error::{IngestError, Result};
use crate::processors::ChangeProcessor;

/// Created/updated/removed counts per entry kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeStats {
    counts: BTreeMap<(EntryKind, ChangeType), u64>,
}

impl ChangeStats {
    pub fn record(&mut self, kind: EntryKind, change_type: ChangeType) {
        *self.counts.entry((kind, change_type)).or_insert(0) += 1;
    }

    pub fn get(&self, kind: EntryKind, change_type: ChangeType) -> u64 {
        self.counts.get(&(kind, change_type)).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// `kind_changetype` → count, for structured logs.
    pub fn to_map(&self) -> BTreeMap<String, u64> {
        self.counts
            .iter()
            .map(|((kind, change_type), n)| (format!("{kind}_{change_type}"), *n))
            .collect()
    }
}

/// Fans each change out to every member, then commits members in order.
pub struct GroupChangeProcessor {
    processors: Vec<Box<dyn ChangeProcessor>>,
    stats: ChangeStats,
}

impl GroupChangeProcessor {
    pub fn new(processors: Vec<Box<dyn ChangeProcessor>>) -> Self {
        Self {
            processors,
            stats: ChangeStats::default(),
        }
    }

    pub fn push(&mut self, processor: Box<dyn ChangeProcessor>) {
        self.processors.push(processor);
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn stats(&self) -> &ChangeStats {
        &self.stats
    }

    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }
}

impl ChangeProcessor for GroupChangeProcessor {
    fn name(&self) -> &str {
        "group"
    }

    fn process_change(&mut self, change: Change) -> Result<()> {
        let change_type = change.change_type().ok_or_else(|| {
            IngestError::state(format!("{} change has neither before nor after", change.kind))
        })?;
        self.stats.record(change.kind, change_type);
        for processor in &mut self.processors {
            processor.process_change(change.clone())?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        for processor in &mut self.processors {
            processor.commit()?;
            debug!(processor = processor.name(), "processor committed");
        }
        Ok(())
    }
}
