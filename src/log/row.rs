use serde::Serialize;

/// One timing result recovered from a benchmark log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub tile_size: Option<u32>,
    pub process_count: u32,
    pub thread_count: Option<u32>,
    pub variant: Option<String>,
    pub elapsed_seconds: f64,
}

impl Measurement {
    /// Total workers: processes times threads (threads default to 1).
    pub fn workers(&self) -> u64 {
        u64::from(self.process_count) * u64::from(self.thread_count.unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(process_count: u32, thread_count: Option<u32>) -> Measurement {
        Measurement {
            tile_size: None,
            process_count,
            thread_count,
            variant: None,
            elapsed_seconds: 1.0,
        }
    }

    #[test]
    fn workers_default_to_one_thread() {
        assert_eq!(run(20, None).workers(), 20);
        assert_eq!(run(4, Some(6)).workers(), 24);
    }

    #[test]
    fn workers_beyond_u32_range() {
        assert_eq!(run(100_000, Some(100_000)).workers(), 10_000_000_000);
        assert_eq!(run(u32::MAX, Some(u32::MAX)).workers(), u64::from(u32::MAX).pow(2));
    }
}
