use crate::catalog::MetricDescriptor;

/// One sample of a catalog metric for a single waiting room.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub descriptor: &'static MetricDescriptor,
    pub waiting_room_id: String,
    pub value: f64,
}

impl Metric {
    pub fn new(descriptor: &'static MetricDescriptor, waiting_room_id: impl Into<String>, value: f64) -> Self {
        Self {
            descriptor,
            waiting_room_id: waiting_room_id.into(),
            value,
        }
    }

    pub fn exported_name(&self) -> &'static str {
        self.descriptor.exported_name
    }

    pub fn description(&self) -> &'static str {
        self.descriptor.description
    }
}
