//! Invariants of cross-page table grouping over generated inputs.

use std::path::PathBuf;

use pdfsift::model::{BBox, TableBlock, NO_TITLE};
use pdfsift::tables::{group_tables, GroupingRules, TableGroupAggregator};

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    fn below(&mut self, n: u32) -> u32 {
        self.next() % n
    }
}

fn block(page: u32, width: f32, title: &str) -> TableBlock {
    TableBlock {
        page,
        image_path: PathBuf::from(format!("tables/page{}_table1.png", page)),
        ocr_text: format!("rows of page {}", page),
        width,
        title: title.to_string(),
        bbox: BBox::new(0.0, 0.0, width, 100.0),
        score: 0.9,
    }
}

fn random_blocks(rng: &mut Lcg) -> Vec<TableBlock> {
    let count = rng.below(12) as usize;
    (0..count)
        .map(|_| {
            let page = 1 + rng.below(10);
            let width = [200.0, 205.0, 260.0, 0.0][rng.below(4) as usize];
            let title = if rng.below(3) == 0 {
                "Table 2. Balance sheet"
            } else {
                NO_TITLE
            };
            block(page, width, title)
        })
        .collect()
}

#[test]
fn test_groups_partition_input() {
    let mut rng = Lcg(7);
    for _ in 0..500 {
        let blocks = random_blocks(&mut rng);
        let mut expected: Vec<u32> = blocks.iter().map(|b| b.page).collect();
        expected.sort_unstable();

        let groups = group_tables(blocks);
        let mut seen: Vec<u32> = groups.iter().flat_map(|g| g.pages()).collect();
        // Group order is page order, so flattening is already sorted.
        let flat = seen.clone();
        seen.sort_unstable();
        assert_eq!(flat, seen);
        assert_eq!(seen, expected);
        assert!(groups.iter().all(|g| !g.is_empty()));
    }
}

#[test]
fn test_members_are_contiguous_untitled_continuations() {
    let mut rng = Lcg(42);
    for _ in 0..500 {
        for group in group_tables(random_blocks(&mut rng)) {
            for pair in group.blocks.windows(2) {
                let (prev, curr) = (&pair[0], &pair[1]);
                assert_eq!(curr.page, prev.page + 1);
                assert!(!curr.has_title());
                let denom = prev.width.max(1.0);
                assert!((curr.width - prev.width).abs() / denom < 0.1);
            }
            assert_eq!(group.title(), group.blocks[0].title);
        }
    }
}

#[test]
fn test_adjacent_groups_could_not_be_joined() {
    let rules = GroupingRules::default();
    let mut rng = Lcg(3);
    for _ in 0..500 {
        let groups = group_tables(random_blocks(&mut rng));
        for pair in groups.windows(2) {
            let prev = pair[0].last().unwrap();
            let next = &pair[1].blocks[0];
            assert!(!rules.continues(prev, next));
        }
    }
}

#[test]
fn test_pages_three_four_six() {
    let groups = group_tables(vec![
        block(3, 200.0, "Table 1"),
        block(4, 200.0, NO_TITLE),
        block(6, 200.0, NO_TITLE),
    ]);
    let pages: Vec<Vec<u32>> = groups.iter().map(|g| g.pages()).collect();
    assert_eq!(pages, vec![vec![3, 4], vec![6]]);
    assert_eq!(groups[0].title(), "Table 1");
}

#[test]
fn test_page_step_rule() {
    let aggregator = TableGroupAggregator::new(GroupingRules::new().with_page_step(2));
    let groups = aggregator.group(vec![block(2, 300.0, NO_TITLE), block(4, 300.0, NO_TITLE)]);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].pages(), vec![2, 4]);

    // The step is exact, not a maximum.
    let groups = aggregator.group(vec![block(2, 300.0, NO_TITLE), block(3, 300.0, NO_TITLE)]);
    assert_eq!(groups.len(), 2);
}
