use crate::models::{InventoryRow, RankedEntry};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// 同一 material 出现多次时的合并规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// 后出现的覆盖前面的
    #[default]
    LastWins,
    FirstWins,
    /// 累加 (饱和)
    Sum,
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-wins" | "last" => Ok(MergePolicy::LastWins),
            "first-wins" | "first" => Ok(MergePolicy::FirstWins),
            "sum" => Ok(MergePolicy::Sum),
            other => Err(format!(
                "unknown merge policy '{}', expected 'last-wins', 'first-wins' or 'sum'",
                other
            )),
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MergePolicy::LastWins => "last-wins",
            MergePolicy::FirstWins => "first-wins",
            MergePolicy::Sum => "sum",
        })
    }
}

/// 归约前的记录顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReduceOrder {
    /// 按日期升序 (稳定排序), 使 last-wins 取到最新一天
    #[default]
    Chronological,
    /// 保持查询返回的顺序
    AsReturned,
}

impl FromStr for ReduceOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chronological" | "date" => Ok(ReduceOrder::Chronological),
            "as-returned" | "result" => Ok(ReduceOrder::AsReturned),
            other => Err(format!(
                "unknown reduce order '{}', expected 'chronological' or 'as-returned'",
                other
            )),
        }
    }
}

/// 按日期稳定排序; 无日期的记录保持相对顺序并排在最前
pub fn order_chronologically<R: InventoryRow>(records: &mut [R]) {
    records.sort_by_key(|r| r.date());
}

/// 单次遍历, 按 material 归约出库存值 (保留首次出现的顺序)
pub fn reduce_stock<'a, R, I>(records: I, policy: MergePolicy) -> IndexMap<String, i64>
where
    R: InventoryRow + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .fold(IndexMap::<String, i64>::new(), |mut acc, rec| {
            let stock = rec.final_stock();
            match acc.get_mut(rec.material()) {
                Some(current) => match policy {
                    MergePolicy::LastWins => *current = stock,
                    MergePolicy::FirstWins => {}
                    MergePolicy::Sum => *current = current.saturating_add(stock),
                },
                None => {
                    acc.insert(rec.material().to_string(), stock);
                }
            }
            acc
        })
}

/// 库存降序, 相同库存按 material 升序, 截取前 k 个
pub fn rank(stock_by_material: IndexMap<String, i64>, k: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = stock_by_material
        .into_iter()
        .map(|(material, stock)| RankedEntry { material, stock })
        .collect();

    entries.sort_by(|a, b| {
        b.stock
            .cmp(&a.stock)
            .then_with(|| a.material.cmp(&b.material))
    });
    entries.truncate(k);
    entries
}

pub fn top_materials<'a, R, I>(records: I, policy: MergePolicy, k: usize) -> Vec<RankedEntry>
where
    R: InventoryRow + 'a,
    I: IntoIterator<Item = &'a R>,
{
    rank(reduce_stock(records, policy), k)
}
