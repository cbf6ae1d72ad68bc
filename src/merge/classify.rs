//! Turning merge hits into histogram cells.
//!
//! A classifier owns the category layout of a run: which histogram columns
//! exist, which (multiplicity, column) cell a hit lands in, how the columns
//! are projected onto plot panels and what the unique-kmer report sums.

use super::{Hit, READS};
use crate::histogram::{CategoryInfo, Histogram};

/// Membership of a k-mer in reads (bit 0), asm1 (bit 1) and asm2 (bit 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VennCategory {
    ReadsOnly = 0b001,
    Asm1Only = 0b010,
    ReadsAndAsm1 = 0b011,
    Asm2Only = 0b100,
    ReadsAndAsm2 = 0b101,
    Asm1AndAsm2 = 0b110,
    AllThree = 0b111,
}

impl VennCategory {
    /// With a single assembly: in reads and in the assembly.
    pub const SHARED: Self = Self::ReadsAndAsm1;
    /// With a single assembly: in the assembly only.
    pub const ASSEMBLY_ONLY: Self = Self::Asm1Only;

    pub fn from_mask(mask: u8) -> Option<Self> {
        Some(match mask {
            0b001 => Self::ReadsOnly,
            0b010 => Self::Asm1Only,
            0b011 => Self::ReadsAndAsm1,
            0b100 => Self::Asm2Only,
            0b101 => Self::ReadsAndAsm2,
            0b110 => Self::Asm1AndAsm2,
            0b111 => Self::AllThree,
            _ => return None,
        })
    }

    #[inline]
    pub fn mask(self) -> u8 {
        self as u8
    }

    pub fn in_reads(self) -> bool {
        self.mask() & 1 != 0
    }

    /// Column label; the one-assembly layout uses shorter names.
    pub fn label(self, assemblies: usize) -> &'static str {
        match (self, assemblies) {
            (Self::ReadsOnly, _) => "read-only",
            (Self::ReadsAndAsm1, 1) => "shared",
            (Self::Asm1Only, 1) => "asm-only",
            (Self::Asm1Only, _) => "asm1-only",
            (Self::ReadsAndAsm1, _) => "reads+asm1",
            (Self::Asm2Only, _) => "asm2-only",
            (Self::ReadsAndAsm2, _) => "reads+asm2",
            (Self::Asm1AndAsm2, _) => "asm1+asm2",
            (Self::AllThree, _) => "reads+asm1+asm2",
        }
    }
}

/// One plotted curve: the sum of some histogram columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSpec {
    pub label: String,
    pub categories: Vec<usize>,
}

impl SeriesSpec {
    pub fn new(label: impl Into<String>, categories: Vec<usize>) -> Self {
        Self {
            label: label.into(),
            categories,
        }
    }
}

/// One plot column: a title and its series in stacking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSpec {
    pub title: String,
    pub series: Vec<SeriesSpec>,
}

/// Category layout and hit classification for one kind of spectrum.
pub trait Classifier: Sync {
    /// Histogram columns, in column order.
    fn categories(&self) -> Vec<CategoryInfo>;

    /// (multiplicity, column) for one hit. Hits always carry a non-empty mask.
    fn classify(&self, hit: &Hit) -> (u32, usize);

    /// Panel projection; `assemblies` names the assembly tables in order.
    fn panels(&self, assemblies: &[String]) -> Vec<PanelSpec>;

    /// Totals of assembly k-mers absent from the reads, by partition.
    fn unique_report(&self, hist: &Histogram) -> Vec<(String, u64)>;

    /// Empty histogram shaped for this classifier.
    fn histogram(&self, cap: u32) -> Histogram {
        Histogram::new(self.categories(), cap)
    }
}

/// Venn membership classifier for one or two assemblies.
#[derive(Debug, Clone)]
pub struct VennClassifier {
    assemblies: usize,
    columns: Vec<VennCategory>,
    /// Column by mask; entry 0 is never read.
    column_of: [usize; 8],
}

impl VennClassifier {
    /// `assemblies` must be 1 or 2; anything above 1 uses the two-assembly layout.
    pub fn new(assemblies: usize) -> Self {
        use VennCategory::*;
        let columns = if assemblies <= 1 {
            vec![ReadsOnly, VennCategory::SHARED, VennCategory::ASSEMBLY_ONLY]
        } else {
            vec![
                ReadsOnly,
                ReadsAndAsm1,
                ReadsAndAsm2,
                AllThree,
                Asm1Only,
                Asm2Only,
                Asm1AndAsm2,
            ]
        };
        let mut column_of = [0usize; 8];
        for (i, cat) in columns.iter().enumerate() {
            column_of[cat.mask() as usize] = i;
        }
        Self {
            assemblies: assemblies.clamp(1, 2),
            columns,
            column_of,
        }
    }

    pub fn assemblies(&self) -> usize {
        self.assemblies
    }

    /// Histogram column of `category`, None if this layout lacks it.
    pub fn column(&self, category: VennCategory) -> Option<usize> {
        self.columns.iter().position(|&c| c == category)
    }

    fn columns_of(&self, cats: &[VennCategory]) -> Vec<usize> {
        cats.iter().filter_map(|&c| self.column(c)).collect()
    }
}

impl Classifier for VennClassifier {
    fn categories(&self) -> Vec<CategoryInfo> {
        self.columns
            .iter()
            .map(|c| CategoryInfo::new(c.label(self.assemblies), c.in_reads()))
            .collect()
    }

    #[inline]
    fn classify(&self, hit: &Hit) -> (u32, usize) {
        let multiplicity = hit.count(READS).unwrap_or(0);
        (multiplicity, self.column_of[(hit.mask & 0b111) as usize])
    }

    fn panels(&self, assemblies: &[String]) -> Vec<PanelSpec> {
        use VennCategory::*;
        let name = |i: usize| {
            assemblies
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("asm{}", i + 1))
        };
        if self.assemblies == 1 {
            return vec![PanelSpec {
                title: name(0),
                series: vec![
                    SeriesSpec::new("read-only", self.columns_of(&[ReadsOnly])),
                    SeriesSpec::new("shared", self.columns_of(&[VennCategory::SHARED])),
                ],
            }];
        }
        [(0, ReadsAndAsm1, ReadsAndAsm2), (1, ReadsAndAsm2, ReadsAndAsm1)]
            .into_iter()
            .map(|(i, this_only, other_only)| {
                let n = i + 1;
                PanelSpec {
                    title: name(i),
                    series: vec![
                        SeriesSpec::new(
                            format!("not in asm{n}"),
                            self.columns_of(&[ReadsOnly, other_only]),
                        ),
                        SeriesSpec::new(format!("asm{n} only"), self.columns_of(&[this_only])),
                        SeriesSpec::new("shared", self.columns_of(&[AllThree])),
                    ],
                }
            })
            .collect()
    }

    fn unique_report(&self, hist: &Histogram) -> Vec<(String, u64)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.in_reads())
            .map(|(i, c)| (c.label(self.assemblies).to_string(), hist.category_total(i)))
            .collect()
    }
}

/// Copy-number classifier: reads against one assembly.
#[derive(Debug, Clone, Copy, Default)]
pub struct CnClassifier;

impl CnClassifier {
    /// Copy numbers above this fold into the `>4` column.
    pub const MAX_COPIES: u32 = 4;
    /// Column of assembly k-mers absent from the reads.
    pub const MISSING: usize = 6;

    const LABELS: [&'static str; 7] = ["read-only", "1", "2", "3", "4", ">4", "missing"];
}

impl Classifier for CnClassifier {
    fn categories(&self) -> Vec<CategoryInfo> {
        Self::LABELS
            .iter()
            .enumerate()
            .map(|(i, label)| CategoryInfo::new(*label, i != Self::MISSING))
            .collect()
    }

    #[inline]
    fn classify(&self, hit: &Hit) -> (u32, usize) {
        let copies = hit.count(1).unwrap_or(0);
        match hit.count(READS) {
            Some(reads) => (reads, copies.min(Self::MAX_COPIES + 1) as usize),
            None => (copies, Self::MISSING),
        }
    }

    fn panels(&self, assemblies: &[String]) -> Vec<PanelSpec> {
        let title = assemblies.first().cloned().unwrap_or_else(|| "asm".to_string());
        vec![PanelSpec {
            title,
            series: Self::LABELS[..Self::MISSING]
                .iter()
                .enumerate()
                .map(|(i, label)| SeriesSpec::new(*label, vec![i]))
                .collect(),
        }]
    }

    fn unique_report(&self, hist: &Histogram) -> Vec<(String, u64)> {
        let one = hist.get(1, Self::MISSING);
        let more = hist.category_total(Self::MISSING) - one;
        vec![("1 copy".to_string(), one), ("2+ copies".to_string(), more)]
    }
}
