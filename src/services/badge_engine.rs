//! Achievement badge engine.
//!
//! A pure function from a student's scores and reconciliation entry to an
//! ordered list of badges. Every rule in the catalog is evaluated
//! independently; tiers never exclude one another. The thresholds are
//! user-visible and must stay stable across releases.

use chrono::{Duration, NaiveDateTime, Timelike};

use crate::domain::models::reconciliation::parse_timestamp;
use crate::domain::models::{Badge, BadgeLevel, ReconciliationEntry, Scores, Student};

/// Fixed offset applied to push timestamps to approximate local time.
const LOCAL_OFFSET_HOURS: i64 = 8;

/// Totals that earn the lucky badge.
const LUCKY_TOTALS: [u32; 9] = [222, 250, 300, 333, 350, 400, 444, 450, 500];

/// Quantities every rule is evaluated against.
#[derive(Debug, Clone)]
struct Metrics {
    scores: Scores,
    avg: f64,
    total: u32,
    non_zero: usize,
    high: usize,
    perfect: usize,
    commits: u64,
    push_hour: Option<u32>,
}

impl Metrics {
    fn new(scores: Scores, entry: &ReconciliationEntry) -> Self {
        let total: u32 = scores.iter().map(|&s| u32::from(s)).sum();
        Self {
            scores,
            avg: f64::from(total) / scores.len() as f64,
            total,
            non_zero: scores.iter().filter(|&&s| s > 0).count(),
            high: scores.iter().filter(|&&s| s >= 90).count(),
            perfect: scores.iter().filter(|&&s| s == 100).count(),
            commits: entry.commits_or_zero(),
            push_hour: entry.last_known_pushed_at.as_deref().and_then(local_push_hour),
        }
    }

    fn all_positive(&self) -> bool {
        self.non_zero == self.scores.len()
    }

    fn all(&self, pred: impl Fn(u8) -> bool) -> bool {
        self.scores.iter().all(|&s| pred(s))
    }

    fn last(&self) -> u8 {
        self.scores[self.scores.len() - 1]
    }

    fn max(&self) -> u8 {
        self.scores.iter().copied().max().unwrap_or(0)
    }

    fn std_dev(&self) -> f64 {
        let n = self.scores.len() as f64;
        let variance = self
            .scores
            .iter()
            .map(|&s| (f64::from(s) - self.avg).powi(2))
            .sum::<f64>()
            / n;
        variance.sqrt()
    }

    /// Mean of the last three phases exceeds the first two by over 15.
    fn improving(&self) -> bool {
        let first = f64::from(u32::from(self.scores[0]) + u32::from(self.scores[1])) / 2.0;
        let rest: u32 = self.scores[2..].iter().map(|&s| u32::from(s)).sum();
        let last = f64::from(rest) / 3.0;
        last > first + 15.0 && last >= 70.0
    }

    fn palindrome(&self) -> bool {
        self.scores.iter().eq(self.scores.iter().rev())
    }

    fn strictly_increasing(&self) -> bool {
        self.scores.windows(2).all(|w| w[0] < w[1])
    }

    fn in_hours(&self, from: u32, to: u32) -> bool {
        self.push_hour.is_some_and(|h| (from..to).contains(&h))
    }
}

/// A badge with a fixed description.
struct Rule {
    icon: &'static str,
    name: &'static str,
    desc: &'static str,
    level: BadgeLevel,
    applies: fn(&Metrics) -> bool,
}

static CATALOG: &[Rule] = &[
    // Entry level
    Rule { icon: "🎉", name: "初来乍到", desc: "完成第一个阶段", level: BadgeLevel::Common, applies: |m| m.non_zero >= 1 },
    Rule { icon: "📝", name: "踏实前行", desc: "完成2个阶段", level: BadgeLevel::Common, applies: |m| m.non_zero >= 2 },
    Rule { icon: "🌱", name: "成长中", desc: "完成3个阶段", level: BadgeLevel::Common, applies: |m| m.non_zero >= 3 },
    Rule { icon: "🚶", name: "稳步推进", desc: "完成4个阶段", level: BadgeLevel::Common, applies: |m| m.non_zero >= 4 },
    Rule { icon: "💯", name: "任务达人", desc: "完成全部5个阶段", level: BadgeLevel::Rare, applies: |m| m.non_zero >= 5 },
    Rule { icon: "📊", name: "及格万岁", desc: "平均分≥60", level: BadgeLevel::Common, applies: |m| m.avg >= 60.0 },
    Rule { icon: "🔰", name: "开门红", desc: "第一阶段≥70", level: BadgeLevel::Common, applies: |m| m.scores[0] >= 70 },
    Rule { icon: "⭐", name: "新手之光", desc: "第一阶段≥85", level: BadgeLevel::Rare, applies: |m| m.scores[0] >= 85 },
    Rule { icon: "💪", name: "努力者", desc: "提交数≥10次", level: BadgeLevel::Common, applies: |m| m.commits >= 10 },
    Rule { icon: "⚡", name: "初露锋芒", desc: "提交数≥25次", level: BadgeLevel::Common, applies: |m| m.commits >= 25 },
    // Advanced
    Rule { icon: "📖", name: "良好", desc: "平均分≥70", level: BadgeLevel::Rare, applies: |m| m.avg >= 70.0 },
    Rule { icon: "✏️", name: "优等生", desc: "平均分≥80", level: BadgeLevel::Rare, applies: |m| m.avg >= 80.0 },
    Rule { icon: "🔥", name: "勤奋者", desc: "提交数≥50次", level: BadgeLevel::Rare, applies: |m| m.commits >= 50 },
    Rule { icon: "🎯", name: "单项冠军", desc: "有1个阶段≥90分", level: BadgeLevel::Rare, applies: |m| m.high >= 1 },
    Rule { icon: "🌟", name: "双冠王", desc: "有2个阶段≥90分", level: BadgeLevel::Rare, applies: |m| m.high >= 2 },
    Rule { icon: "💎", name: "满分首秀", desc: "获得首个满分", level: BadgeLevel::Rare, applies: |m| m.perfect >= 1 },
    // Rare
    Rule { icon: "🚀", name: "全能战士", desc: "所有阶段≥60", level: BadgeLevel::Rare, applies: |m| m.all_positive() && m.all(|s| s >= 60) },
    Rule { icon: "💪", name: "勤奋之星", desc: "提交数≥80次", level: BadgeLevel::Epic, applies: |m| m.commits >= 80 },
    Rule { icon: "🎯", name: "三冠王", desc: "有3个阶段≥90分", level: BadgeLevel::Epic, applies: |m| m.high >= 3 },
    Rule { icon: "🌈", name: "进步之星", desc: "持续进步超15分", level: BadgeLevel::Rare, applies: |m| m.all_positive() && m.improving() },
    Rule { icon: "💫", name: "冲刺王", desc: "最后阶段表现最好", level: BadgeLevel::Rare, applies: |m| m.last() > 0 && m.last() == m.max() && m.last() >= 85 },
    Rule { icon: "🎖️", name: "稳定发挥", desc: "分数波动小且稳定", level: BadgeLevel::Rare, applies: |m| m.all_positive() && m.std_dev() < 10.0 && m.avg >= 70.0 },
    Rule { icon: "🏅", name: "均衡发展", desc: "所有阶段70-90分", level: BadgeLevel::Rare, applies: |m| m.all(|s| (70..=90).contains(&s)) },
    // Epic
    Rule { icon: "📚", name: "学霸", desc: "平均分≥90", level: BadgeLevel::Epic, applies: |m| m.avg >= 90.0 },
    Rule { icon: "💎", name: "精益求精", desc: "所有阶段≥85", level: BadgeLevel::Epic, applies: |m| m.all(|s| s >= 85) },
    Rule { icon: "🔥", name: "超级肝帝", desc: "提交数≥150次", level: BadgeLevel::Epic, applies: |m| m.commits >= 150 },
    Rule { icon: "⭐", name: "高效新星", desc: "低提交高分数", level: BadgeLevel::Epic, applies: |m| (10..=35).contains(&m.commits) && m.avg >= 85.0 },
    Rule { icon: "🎯", name: "四冠王", desc: "有4个阶段≥90分", level: BadgeLevel::Epic, applies: |m| m.high >= 4 },
    Rule { icon: "💫", name: "满分双响", desc: "获得2个满分", level: BadgeLevel::Epic, applies: |m| m.perfect >= 2 },
    // Legendary
    Rule { icon: "🏆", name: "完美主义者", desc: "所有阶段满分", level: BadgeLevel::Legendary, applies: |m| m.all(|s| s == 100) },
    Rule { icon: "🌟", name: "神级学霸", desc: "平均分≥95", level: BadgeLevel::Legendary, applies: |m| m.avg >= 95.0 },
    Rule { icon: "🎨", name: "代码艺术家", desc: "量质兼优", level: BadgeLevel::Legendary, applies: |m| m.commits >= 100 && m.avg >= 85.0 },
    Rule { icon: "🎓", name: "学习榜样", desc: "成绩优异且勤奋", level: BadgeLevel::Legendary, applies: |m| m.avg >= 90.0 && m.commits >= 60 },
    // Special
    Rule { icon: "🦉", name: "夜猫子", desc: "凌晨2-5点提交", level: BadgeLevel::Special, applies: |m| m.in_hours(2, 5) },
    Rule { icon: "🌠", name: "早起鸟", desc: "早上6-8点提交", level: BadgeLevel::Special, applies: |m| m.in_hours(6, 8) },
    Rule { icon: "🎲", name: "幸运7", desc: "获得77分", level: BadgeLevel::Special, applies: |m| m.scores.contains(&77) },
    Rule { icon: "🎰", name: "对称美", desc: "分数完美对称", level: BadgeLevel::Special, applies: |m| m.all_positive() && m.palindrome() },
    Rule { icon: "📈", name: "直线上升", desc: "分数逐步提升", level: BadgeLevel::Special, applies: |m| m.all_positive() && m.strictly_increasing() },
    Rule { icon: "🎪", name: "提交狂人", desc: "提交数≥200次", level: BadgeLevel::Special, applies: |m| m.commits >= 200 },
];

/// Compute the badges earned by a student.
///
/// Output is ordered by rarity (legendary first) and then by name, so
/// identical input always yields identical output.
pub fn calculate_badges(student: &Student, entry: &ReconciliationEntry) -> Vec<Badge> {
    calculate_badges_for_scores(student.scores, entry)
}

/// Same as [`calculate_badges`] for a bare score array.
pub fn calculate_badges_for_scores(scores: Scores, entry: &ReconciliationEntry) -> Vec<Badge> {
    let metrics = Metrics::new(scores, entry);

    let mut badges: Vec<Badge> = CATALOG
        .iter()
        .filter(|rule| (rule.applies)(&metrics))
        .map(|rule| Badge::new(rule.icon, rule.name, rule.desc, rule.level))
        .collect();

    if metrics.perfect >= 4 {
        badges.push(Badge::new(
            "👑",
            "全满贯",
            format!("获得{}个满分", metrics.perfect),
            BadgeLevel::Legendary,
        ));
    }
    if LUCKY_TOTALS.contains(&metrics.total) {
        badges.push(Badge::new(
            "🎁",
            "幸运儿",
            format!("总分正好{}分", metrics.total),
            BadgeLevel::Special,
        ));
    }

    badges.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(b.name)));
    badges
}

/// Hour of day of a push timestamp shifted by [`LOCAL_OFFSET_HOURS`].
///
/// The shift applies to the timestamp's own wall clock. Offset-less
/// timestamps are accepted as-is; anything unparseable yields `None`.
fn local_push_hour(raw: &str) -> Option<u32> {
    let wall_clock = parse_timestamp(raw).map(|dt| dt.naive_local()).or_else(|| {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    })?;
    Some((wall_clock + Duration::hours(LOCAL_OFFSET_HOURS)).hour())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_commits(commits: i64) -> ReconciliationEntry {
        ReconciliationEntry {
            commits_count: Some(commits),
            ..Default::default()
        }
    }

    fn entry_pushed_at(ts: &str) -> ReconciliationEntry {
        ReconciliationEntry {
            last_known_pushed_at: Some(ts.to_string()),
            ..Default::default()
        }
    }

    fn names(badges: &[Badge]) -> Vec<&'static str> {
        badges.iter().map(|b| b.name).collect()
    }

    /// (badge, scores and commits at the threshold, one step below it)
    type Boundary = (&'static str, (Scores, i64), (Scores, i64));

    const BOUNDARIES: &[Boundary] = &[
        // Completed phases
        ("初来乍到", ([1, 0, 0, 0, 0], 0), ([0, 0, 0, 0, 0], 0)),
        ("踏实前行", ([1, 1, 0, 0, 0], 0), ([1, 0, 0, 0, 0], 0)),
        ("成长中", ([1, 1, 1, 0, 0], 0), ([1, 1, 0, 0, 0], 0)),
        ("稳步推进", ([1, 1, 1, 1, 0], 0), ([1, 1, 1, 0, 0], 0)),
        ("任务达人", ([1, 1, 1, 1, 1], 0), ([1, 1, 1, 1, 0], 0)),
        // Averages
        ("及格万岁", ([60; 5], 0), ([60, 60, 60, 60, 59], 0)),
        ("良好", ([70; 5], 0), ([70, 70, 70, 70, 69], 0)),
        ("优等生", ([80; 5], 0), ([80, 80, 80, 80, 79], 0)),
        ("学霸", ([90; 5], 0), ([89, 90, 90, 90, 90], 0)),
        ("神级学霸", ([95; 5], 0), ([94, 95, 95, 95, 95], 0)),
        // First phase
        ("开门红", ([70, 0, 0, 0, 0], 0), ([69, 0, 0, 0, 0], 0)),
        ("新手之光", ([85, 0, 0, 0, 0], 0), ([84, 0, 0, 0, 0], 0)),
        // Commits
        ("努力者", ([0; 5], 10), ([0; 5], 9)),
        ("初露锋芒", ([0; 5], 25), ([0; 5], 24)),
        ("勤奋者", ([0; 5], 50), ([0; 5], 49)),
        ("勤奋之星", ([0; 5], 80), ([0; 5], 79)),
        ("超级肝帝", ([0; 5], 150), ([0; 5], 149)),
        ("提交狂人", ([0; 5], 200), ([0; 5], 199)),
        // High and perfect counts
        ("单项冠军", ([90, 0, 0, 0, 0], 0), ([89, 0, 0, 0, 0], 0)),
        ("双冠王", ([90, 90, 0, 0, 0], 0), ([90, 89, 0, 0, 0], 0)),
        ("三冠王", ([90, 90, 90, 0, 0], 0), ([90, 90, 89, 0, 0], 0)),
        ("四冠王", ([90, 90, 90, 90, 0], 0), ([90, 90, 90, 89, 0], 0)),
        ("满分首秀", ([100, 0, 0, 0, 0], 0), ([99, 0, 0, 0, 0], 0)),
        ("满分双响", ([100, 100, 0, 0, 0], 0), ([100, 99, 0, 0, 0], 0)),
        ("全满贯", ([100, 100, 100, 100, 0], 0), ([100, 100, 100, 99, 0], 0)),
        ("完美主义者", ([100; 5], 0), ([100, 100, 100, 100, 99], 0)),
        // Every phase
        ("全能战士", ([60; 5], 0), ([60, 60, 60, 60, 59], 0)),
        ("精益求精", ([85; 5], 0), ([85, 85, 85, 85, 84], 0)),
        ("均衡发展", ([70, 90, 80, 80, 80], 0), ([69, 90, 80, 80, 80], 0)),
        ("均衡发展", ([70, 90, 80, 80, 80], 0), ([70, 91, 80, 80, 80], 0)),
        ("稳定发挥", ([70; 5], 0), ([70, 70, 70, 70, 69], 0)),
        // Shape
        ("进步之星", ([50, 50, 70, 70, 70], 0), ([55, 55, 70, 70, 70], 0)),
        ("冲刺王", ([0, 0, 0, 0, 85], 0), ([0, 0, 0, 0, 84], 0)),
        ("对称美", ([1, 2, 3, 2, 1], 0), ([1, 2, 3, 2, 2], 0)),
        ("直线上升", ([1, 2, 3, 4, 5], 0), ([1, 2, 3, 4, 4], 0)),
        ("幸运7", ([77, 0, 0, 0, 0], 0), ([76, 0, 0, 0, 0], 0)),
        ("幸运儿", ([100, 100, 22, 0, 0], 0), ([100, 100, 21, 0, 0], 0)),
        // Scores combined with commits
        ("高效新星", ([85; 5], 10), ([85; 5], 9)),
        ("代码艺术家", ([85; 5], 100), ([85; 5], 99)),
        ("代码艺术家", ([85; 5], 100), ([85, 85, 85, 85, 84], 100)),
        ("学习榜样", ([90; 5], 60), ([90; 5], 59)),
        ("学习榜样", ([90; 5], 60), ([89, 90, 90, 90, 90], 60)),
    ];

    #[test]
    fn test_every_rule_at_and_below_threshold() {
        for &(badge, (at_scores, at_commits), (below_scores, below_commits)) in BOUNDARIES {
            let at = calculate_badges_for_scores(at_scores, &entry_with_commits(at_commits));
            assert!(
                names(&at).contains(&badge),
                "{badge} missing for {at_scores:?} with {at_commits} commits"
            );

            let below = calculate_badges_for_scores(below_scores, &entry_with_commits(below_commits));
            assert!(
                !names(&below).contains(&badge),
                "{badge} unexpected for {below_scores:?} with {below_commits} commits"
            );
        }
    }

    #[test]
    fn test_every_catalog_rule_has_a_boundary_case() {
        let covered: Vec<&str> = BOUNDARIES.iter().map(|(name, _, _)| *name).collect();
        // Push-time rules have their own boundary test.
        for rule in CATALOG.iter().filter(|r| !["夜猫子", "早起鸟"].contains(&r.name)) {
            assert!(covered.contains(&rule.name), "no boundary case for {}", rule.name);
        }
        assert!(covered.contains(&"全满贯"));
        assert!(covered.contains(&"幸运儿"));
    }

    #[test]
    fn test_perfect_scores_include_subsumed_tiers() {
        let badges = calculate_badges_for_scores([100; 5], &entry_with_commits(0));
        let names = names(&badges);
        for expected in ["完美主义者", "学霸", "神级学霸", "全满贯", "精益求精", "满分双响", "良好", "初来乍到", "对称美", "幸运儿"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        // Constant scores are not strictly increasing, commits are zero.
        assert!(!names.contains(&"直线上升"));
        assert!(!names.contains(&"努力者"));

        let full_slam = badges.iter().find(|b| b.name == "全满贯").unwrap();
        assert_eq!(full_slam.desc, "获得5个满分");
        let lucky = badges.iter().find(|b| b.name == "幸运儿").unwrap();
        assert_eq!(lucky.desc, "总分正好500分");
    }

    #[test]
    fn test_commit_thresholds() {
        let at = calculate_badges_for_scores([0; 5], &entry_with_commits(150));
        assert!(names(&at).contains(&"超级肝帝"));
        assert!(names(&at).contains(&"勤奋之星"));

        let below = calculate_badges_for_scores([0; 5], &entry_with_commits(149));
        assert!(!names(&below).contains(&"超级肝帝"));

        let manic = calculate_badges_for_scores([0; 5], &entry_with_commits(200));
        assert!(names(&manic).contains(&"提交狂人"));
    }

    #[test]
    fn test_no_activity_no_badges() {
        let badges = calculate_badges_for_scores([0; 5], &ReconciliationEntry::default());
        assert!(badges.is_empty());
    }

    #[test]
    fn test_sorted_by_rarity_then_name() {
        let badges = calculate_badges_for_scores([100, 95, 92, 91, 100], &entry_with_commits(120));
        assert!(badges.windows(2).all(|w| {
            (w[0].level, w[0].name) <= (w[1].level, w[1].name)
        }));
        assert_eq!(badges[0].level, BadgeLevel::Legendary);
    }

    #[test]
    fn test_deterministic() {
        let entry = entry_with_commits(42);
        let a = calculate_badges_for_scores([70, 80, 77, 88, 99], &entry);
        let b = calculate_badges_for_scores([70, 80, 77, 88, 99], &entry);
        assert_eq!(a, b);
        assert!(names(&a).contains(&"幸运7"));
    }

    #[test]
    fn test_progress_badges() {
        let badges = calculate_badges_for_scores([60, 65, 80, 85, 90], &ReconciliationEntry::default());
        let names = names(&badges);
        assert!(names.contains(&"直线上升"));
        assert!(names.contains(&"进步之星"));
        assert!(names.contains(&"冲刺王"));
        assert!(names.contains(&"全能战士"));
    }

    #[test]
    fn test_balanced_and_steady() {
        let badges = calculate_badges_for_scores([80, 82, 78, 81, 79], &ReconciliationEntry::default());
        let names = names(&badges);
        assert!(names.contains(&"均衡发展"));
        assert!(names.contains(&"稳定发挥"));
        assert!(!names.contains(&"单项冠军"));
    }

    #[test]
    fn test_efficient_star_window() {
        let scores = [90, 85, 88, 86, 87];
        assert!(names(&calculate_badges_for_scores(scores, &entry_with_commits(10))).contains(&"高效新星"));
        assert!(names(&calculate_badges_for_scores(scores, &entry_with_commits(35))).contains(&"高效新星"));
        assert!(!names(&calculate_badges_for_scores(scores, &entry_with_commits(36))).contains(&"高效新星"));
    }

    #[test]
    fn test_night_owl_uses_shifted_hour() {
        // 19:30 UTC is 03:30 at +8.
        let badges = calculate_badges_for_scores([0; 5], &entry_pushed_at("2024-03-01T19:30:00Z"));
        assert_eq!(names(&badges), vec!["夜猫子"]);

        // 22:15 UTC is 06:15 at +8.
        let badges = calculate_badges_for_scores([0; 5], &entry_pushed_at("2024-03-01T22:15:00Z"));
        assert_eq!(names(&badges), vec!["早起鸟"]);
    }

    #[test]
    fn test_push_hour_window_edges() {
        let cases = [
            ("2024-03-01T17:59:00Z", None),
            ("2024-03-01T18:00:00Z", Some("夜猫子")),
            ("2024-03-01T20:59:00Z", Some("夜猫子")),
            ("2024-03-01T21:00:00Z", None),
            ("2024-03-01T22:00:00Z", Some("早起鸟")),
            ("2024-03-01T23:59:00Z", Some("早起鸟")),
            ("2024-03-02T00:00:00Z", None),
        ];
        for (pushed_at, expected) in cases {
            let badges = calculate_badges_for_scores([0; 5], &entry_pushed_at(pushed_at));
            assert_eq!(names(&badges), expected.into_iter().collect::<Vec<_>>(), "{pushed_at}");
        }
    }

    #[test]
    fn test_unparseable_push_time_only_skips_time_badges() {
        let mut entry = entry_pushed_at("not-a-timestamp");
        entry.commits_count = Some(12);
        let badges = calculate_badges_for_scores([50, 0, 0, 0, 0], &entry);
        let names = names(&badges);
        assert!(names.contains(&"努力者"));
        assert!(names.contains(&"初来乍到"));
        assert!(!names.contains(&"夜猫子"));
    }

    #[test]
    fn test_local_push_hour_formats() {
        assert_eq!(local_push_hour("2024-03-01T00:00:00Z"), Some(8));
        assert_eq!(local_push_hour("2024-03-01T20:00:00+02:00"), Some(4));
        assert_eq!(local_push_hour("2024-03-01T18:00:00"), Some(2));
        assert_eq!(local_push_hour("garbage"), None);
    }
}
