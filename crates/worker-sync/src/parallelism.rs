//! Default max worker resolution

/// Natural parallelism of the host: the number of usable logical CPUs
///
/// Honors cgroup/affinity limits through `num_cpus`. Always at least 1 so the
/// result can replace the unset sentinel.
#[must_use]
pub fn default_parallelism() -> u32 {
    u32::try_from(num_cpus::get()).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parallelism_is_positive() {
        assert!(default_parallelism() >= 1);
    }

    #[test]
    fn test_default_parallelism_matches_cpu_count() {
        assert_eq!(default_parallelism() as usize, num_cpus::get());
    }
}
