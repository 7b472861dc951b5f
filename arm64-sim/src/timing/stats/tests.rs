use super::*;

#[test]
fn cpi_is_zero_before_anything_retires() {
    let stats = Statistics::default();
    assert_eq!(stats.cpi(), 0.0);
}

#[test]
fn cpi_divides_cycles_by_instructions() {
    let stats = Statistics {
        cycles: 10,
        instructions: 4,
        ..Default::default()
    };
    assert_eq!(stats.cpi(), 2.5);
}

#[test]
fn cache_stats_hit_rate() {
    let cs = CacheStats { hits: 3, misses: 1 };
    assert_eq!(cs.accesses(), 4);
    assert_eq!(cs.hit_rate(), 0.75);
}

#[test]
fn display_includes_cpi_and_hit_rates() {
    let stats = Statistics {
        cycles: 100,
        instructions: 50,
        dcache: CacheStats { hits: 9, misses: 1 },
        ..Default::default()
    };
    let rendered = stats.to_string();
    assert!(rendered.contains("cpi:"));
    assert!(rendered.contains("2.000"));
    assert!(rendered.contains("90.0% hit"));
}
