use serde::{Deserialize, Serialize};

/// 内部因素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalKind {
    Strength,
    Weakness,
}

/// 内部因素：高于或低于同行的类别
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalFactor {
    pub kind: InternalKind,
    pub category_id: String,
    pub name: String,
    /// score - benchmark median
    pub gap: f64,
}

/// TOWS 象限中的一条组合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEntry {
    /// 象限内排名，从 1 开始
    pub priority: usize,
    pub internal: InternalFactor,
    /// 外部机会或威胁标签（原样保留）
    pub external: String,
}

/// TOWS 战略矩阵
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyMatrix {
    pub strengths: Vec<InternalFactor>,
    pub weaknesses: Vec<InternalFactor>,
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
    /// 优势 × 机会
    pub so: Vec<StrategyEntry>,
    /// 劣势 × 机会
    pub wo: Vec<StrategyEntry>,
    /// 优势 × 威胁
    pub st: Vec<StrategyEntry>,
    /// 劣势 × 威胁
    pub wt: Vec<StrategyEntry>,
}

impl StrategyMatrix {
    pub fn is_empty(&self) -> bool {
        self.so.is_empty() && self.wo.is_empty() && self.st.is_empty() && self.wt.is_empty()
    }

    /// 四个象限，按 SO / WO / ST / WT 顺序
    pub fn quadrants(&self) -> [(&'static str, &[StrategyEntry]); 4] {
        [
            ("SO", self.so.as_slice()),
            ("WO", self.wo.as_slice()),
            ("ST", self.st.as_slice()),
            ("WT", self.wt.as_slice()),
        ]
    }
}
