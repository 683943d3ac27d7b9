use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    Start { pings: usize },
    Advance { fraction: f32 },
    Finish,
}

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

pub(crate) fn report_progress(sink: Option<&ProgressSink>, event: ProgressEvent) {
    let Some(sink) = sink else {
        return;
    };
    let event = match event {
        ProgressEvent::Advance { fraction } => ProgressEvent::Advance {
            fraction: fraction.clamp(0.0, 1.0),
        },
        other => other,
    };
    (sink)(event);
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{report_progress, ProgressEvent, ProgressSink};

    #[test]
    fn advance_is_clamped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = seen.clone();
        let sink: ProgressSink = Arc::new(move |event| store.lock().unwrap().push(event));
        report_progress(Some(&sink), ProgressEvent::Advance { fraction: 1.5 });
        report_progress(None, ProgressEvent::Finish);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ProgressEvent::Advance { fraction: 1.0 }]
        );
    }
}
