//! Linear Ad Replacement (LAR) registry
//!
//! LAR replaces scheduled ad windows in linear/live content with targeted
//! ads. Here the windows are a fixed table of [`AdPod`]s keyed by content
//! position. The registry answers two questions for the playback screen's
//! polling loop: "does a pod start at this position?" and "which ad of the
//! active pod is on air?". It never touches the media engine; the result is
//! an overlay annotation only.
//!
//! One registry is constructed per playback screen. The active-pod slot is
//! last-write-wins.

use serde::Serialize;
use tracing::info;

/// A single ad inside a pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ad {
    pub id: String,
    pub title: String,
    pub duration_ms: u64,
    pub advertiser: String,
    pub click_through_url: Option<String>,
}

impl Ad {
    fn new(id: &str, title: &str, duration_ms: u64, advertiser: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            duration_ms,
            advertiser: advertiser.to_string(),
            click_through_url: None,
        }
    }
}

/// Contiguous group of ads filling one LAR window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdPod {
    pub id: String,
    pub ads: Vec<Ad>,
    /// Content position (ms) where the pod starts
    pub start_position_ms: u64,
    /// Total pod duration (ms)
    pub total_duration_ms: u64,
}

impl AdPod {
    pub fn end_position_ms(&self) -> u64 {
        self.start_position_ms.saturating_add(self.total_duration_ms)
    }

    /// `[start, start + duration)`
    pub fn contains(&self, position_ms: u64) -> bool {
        position_ms >= self.start_position_ms && position_ms < self.end_position_ms()
    }
}

/// Pods shipped with the demo: 2, 5 and 8 minutes into the content
pub fn demo_ad_pods() -> Vec<AdPod> {
    vec![
        AdPod {
            id: "pod1".to_string(),
            ads: vec![
                Ad::new("ad1", "Premium Coffee - 30s", 30_000, "CoffeeBreak Inc."),
                Ad::new("ad2", "New Smartphone - 20s", 20_000, "TechGiant Corp."),
            ],
            start_position_ms: 120_000,
            total_duration_ms: 50_000,
        },
        AdPod {
            id: "pod2".to_string(),
            ads: vec![
                Ad::new("ad3", "Summer Sale - 15s", 15_000, "Fashion Retailer"),
                Ad::new("ad4", "Car Insurance - 30s", 30_000, "Insurance Co."),
                Ad::new("ad5", "Energy Drink - 15s", 15_000, "Beverage Brand"),
            ],
            start_position_ms: 300_000,
            total_duration_ms: 60_000,
        },
        AdPod {
            id: "pod3".to_string(),
            ads: vec![Ad::new(
                "ad6",
                "Holiday Destination - 30s",
                30_000,
                "Travel Agency",
            )],
            start_position_ms: 480_000,
            total_duration_ms: 30_000,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct LinearAdRegistry {
    pods: Vec<AdPod>,
    current_pod: Option<AdPod>,
}

impl Default for LinearAdRegistry {
    fn default() -> Self {
        Self::new(demo_ad_pods())
    }
}

impl LinearAdRegistry {
    pub fn new(pods: Vec<AdPod>) -> Self {
        Self {
            pods,
            current_pod: None,
        }
    }

    /// First pod whose window contains `position_ms` and that is not the
    /// active one. Always `None` for content without ads.
    pub fn check_for_ad_break(&self, position_ms: u64, content_has_ads: bool) -> Option<&AdPod> {
        if !content_has_ads {
            return None;
        }

        let active_id = self.current_pod.as_ref().map(|p| p.id.as_str());
        self.pods
            .iter()
            .find(|pod| pod.contains(position_ms) && active_id != Some(pod.id.as_str()))
    }

    /// Make `pod` the active pod, replacing any other
    pub fn start_ad_pod(&mut self, pod: AdPod) {
        info!(
            "🎬 LAR: Starting ad pod {} with {} ads",
            pod.id,
            pod.ads.len()
        );
        self.current_pod = Some(pod);
    }

    /// Clear the active pod, returning it
    pub fn end_ad_pod(&mut self) -> Option<AdPod> {
        let ended = self.current_pod.take();
        if let Some(ref pod) = ended {
            info!("✅ LAR: Ended ad pod {}", pod.id);
        }
        ended
    }

    pub fn current_ad_pod(&self) -> Option<&AdPod> {
        self.current_pod.as_ref()
    }

    pub fn is_ad_playing(&self) -> bool {
        self.current_pod.is_some()
    }

    /// Ad of the active pod on air at `position_in_pod_ms` (offset from pod start)
    pub fn current_ad(&self, position_in_pod_ms: u64) -> Option<&Ad> {
        let pod = self.current_pod.as_ref()?;
        let mut cumulative = 0u64;

        for ad in &pod.ads {
            let end = cumulative.saturating_add(ad.duration_ms);
            if position_in_pod_ms >= cumulative && position_in_pod_ms < end {
                return Some(ad);
            }
            cumulative = end;
        }

        None
    }

    /// Whether the active pod should end at `position_ms`: playback moved
    /// past its end or was scrubbed back before its start.
    pub fn should_end(&self, position_ms: u64) -> bool {
        self.current_pod.as_ref().is_some_and(|pod| {
            position_ms < pod.start_position_ms || position_ms > pod.end_position_ms()
        })
    }

    pub fn reset(&mut self) {
        self.current_pod = None;
    }

    /// Whether any pod window contains `position_ms`
    pub fn is_in_ad_range(&self, position_ms: u64, content_has_ads: bool) -> bool {
        content_has_ads && self.pods.iter().any(|pod| pod.contains(position_ms))
    }

    /// Pod start positions, for timeline markers
    pub fn ad_cue_points(&self, content_has_ads: bool) -> Vec<u64> {
        if content_has_ads {
            self.pods.iter().map(|pod| pod.start_position_ms).collect()
        } else {
            Vec::new()
        }
    }

    pub fn pods(&self) -> &[AdPod] {
        &self.pods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(id: &str, start: u64, ads: &[u64]) -> AdPod {
        AdPod {
            id: id.to_string(),
            ads: ads
                .iter()
                .enumerate()
                .map(|(i, d)| Ad::new(&format!("{}-ad{}", id, i), "Test ad", *d, "Tester"))
                .collect(),
            start_position_ms: start,
            total_duration_ms: ads.iter().sum(),
        }
    }

    #[test]
    fn finds_pod_in_range() {
        let registry = LinearAdRegistry::default();

        assert_eq!(
            registry.check_for_ad_break(120_000, true).map(|p| p.id.as_str()),
            Some("pod1")
        );
        assert_eq!(
            registry.check_for_ad_break(169_999, true).map(|p| p.id.as_str()),
            Some("pod1")
        );
        assert!(registry.check_for_ad_break(170_000, true).is_none());
        assert!(registry.check_for_ad_break(119_999, true).is_none());
    }

    #[test]
    fn no_pods_for_content_without_ads() {
        let registry = LinearAdRegistry::default();
        assert!(registry.check_for_ad_break(120_000, false).is_none());
        assert!(!registry.is_in_ad_range(120_000, false));
        assert!(registry.ad_cue_points(false).is_empty());
    }

    #[test]
    fn active_pod_is_never_returned() {
        let mut registry = LinearAdRegistry::new(vec![
            pod("a", 10_000, &[20_000]),
            pod("b", 20_000, &[20_000]),
        ]);

        let first = registry.check_for_ad_break(25_000, true).cloned().unwrap();
        assert_eq!(first.id, "a");
        registry.start_ad_pod(first);

        // Position lies in both windows; the active pod is skipped
        let next = registry.check_for_ad_break(25_000, true).cloned().unwrap();
        assert_eq!(next.id, "b");

        registry.start_ad_pod(next);
        assert_eq!(registry.check_for_ad_break(25_000, true).unwrap().id, "a");
    }

    #[test]
    fn start_replaces_active_pod() {
        let mut registry = LinearAdRegistry::new(vec![
            pod("a", 10_000, &[20_000]),
            pod("b", 20_000, &[20_000]),
        ]);
        let pods = registry.pods().to_vec();

        registry.start_ad_pod(pods[0].clone());
        registry.start_ad_pod(pods[1].clone());

        assert_eq!(registry.current_ad_pod().map(|p| p.id.as_str()), Some("b"));
        assert_eq!(registry.end_ad_pod().map(|p| p.id), Some("b".to_string()));
        assert!(!registry.is_ad_playing());
        assert!(registry.end_ad_pod().is_none());
    }

    #[test]
    fn current_ad_walks_cumulative_durations() {
        let mut registry = LinearAdRegistry::default();
        let pod2 = registry.pods()[1].clone();
        registry.start_ad_pod(pod2);

        assert_eq!(registry.current_ad(0).map(|a| a.id.as_str()), Some("ad3"));
        assert_eq!(registry.current_ad(14_999).map(|a| a.id.as_str()), Some("ad3"));
        assert_eq!(registry.current_ad(15_000).map(|a| a.id.as_str()), Some("ad4"));
        assert_eq!(registry.current_ad(45_000).map(|a| a.id.as_str()), Some("ad5"));
        assert!(registry.current_ad(60_000).is_none());
    }

    #[test]
    fn current_ad_saturates_on_huge_durations() {
        let huge = AdPod {
            id: "huge".to_string(),
            ads: vec![
                Ad::new("long", "Endless ad", u64::MAX - 10, "Tester"),
                Ad::new("short", "Short ad", 100, "Tester"),
                Ad::new("never", "Unreachable ad", 5, "Tester"),
            ],
            start_position_ms: 0,
            total_duration_ms: u64::MAX,
        };
        let mut registry = LinearAdRegistry::new(vec![huge.clone()]);
        registry.start_ad_pod(huge);

        assert_eq!(registry.current_ad(u64::MAX - 5).map(|a| a.id.as_str()), Some("short"));
        assert!(registry.current_ad(u64::MAX).is_none());
    }

    #[test]
    fn current_ad_without_active_pod() {
        let registry = LinearAdRegistry::default();
        assert!(registry.current_ad(0).is_none());
    }

    #[test]
    fn should_end_outside_active_window() {
        let mut registry = LinearAdRegistry::default();
        assert!(!registry.should_end(0));

        let pod1 = registry.pods()[0].clone();
        registry.start_ad_pod(pod1);

        assert!(!registry.should_end(120_000));
        assert!(!registry.should_end(170_000));
        assert!(registry.should_end(170_001));
        assert!(registry.should_end(60_000));
    }

    #[test]
    fn reset_clears_active_pod() {
        let mut registry = LinearAdRegistry::default();
        let pod3 = registry.pods()[2].clone();
        registry.start_ad_pod(pod3);
        registry.reset();
        assert!(registry.current_ad_pod().is_none());
    }

    #[test]
    fn cue_points_and_ranges() {
        let registry = LinearAdRegistry::default();
        assert_eq!(registry.ad_cue_points(true), vec![120_000, 300_000, 480_000]);
        assert!(registry.is_in_ad_range(301_000, true));
        assert!(!registry.is_in_ad_range(400_000, true));
    }
}
