use crate::point::SoundingId;
use crate::survey::{BeamFlags, HistoryRecord, Ping, Survey};

/// Supplies pings, in record order, to the batcher.
pub trait SoundingSource {
    fn ping_count(&self) -> usize;

    fn ping(&self, index: usize) -> Option<&Ping>;
}

/// Receives filter results for persistent storage.
pub trait SoundingSink {
    /// Marks a sounding as filter-edited. Returns `false` when the id does not
    /// name a beam.
    fn mark_filtered(&mut self, id: SoundingId) -> bool;

    fn append_history(&mut self, record: HistoryRecord);
}

impl SoundingSource for Survey {
    fn ping_count(&self) -> usize {
        self.pings.len()
    }

    fn ping(&self, index: usize) -> Option<&Ping> {
        self.pings.get(index)
    }
}

impl SoundingSink for Survey {
    fn mark_filtered(&mut self, id: SoundingId) -> bool {
        let Some(beam) = self
            .pings
            .get_mut(id.ping)
            .and_then(|ping| ping.beams.get_mut(id.beam))
        else {
            return false;
        };
        beam.flags.insert(BeamFlags::FILTER_EDITED);
        true
    }

    fn append_history(&mut self, record: HistoryRecord) {
        self.history.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::{SoundingSink, SoundingSource};
    use crate::point::SoundingId;
    use crate::survey::{Beam, BeamFlags, Ping, Survey};

    #[test]
    fn survey_marks_beams_in_place() {
        let mut survey = Survey::new(vec![Ping {
            beams: vec![Beam::default(), Beam::default()],
            ..Ping::default()
        }]);
        assert_eq!(survey.ping_count(), 1);
        assert!(survey.mark_filtered(SoundingId { ping: 0, beam: 1 }));
        assert!(!survey.mark_filtered(SoundingId { ping: 0, beam: 2 }));
        assert!(!survey.mark_filtered(SoundingId { ping: 3, beam: 0 }));

        let flags: Vec<BeamFlags> = survey.pings[0].beams.iter().map(|b| b.flags).collect();
        assert_eq!(flags, vec![BeamFlags::NONE, BeamFlags::FILTER_EDITED]);
    }
}
