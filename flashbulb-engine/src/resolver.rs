//! 检测结果归并：分组 → 置信度饱和累加 → 版本择优 → 推导 → 排除 → 分类 → 排序
//! 纯函数，无共享可变状态
use std::cmp::Ordering;
use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::core::{CategoryRef, Detection, Resolution, SignalKind, TechnologySignature};
use crate::store::SignatureStore;

/// 候选版本（来自某条检测记录）
#[derive(Debug, Clone)]
struct VersionPick {
    version: String,
    confidence: u8,
    kind: SignalKind,
}

impl VersionPick {
    /// 置信度高者优先；相同时信号越权威越优先；再相同时版本更具体（更长）优先
    fn beats(&self, other: &VersionPick) -> bool {
        match self.confidence.cmp(&other.confidence) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
        match self.kind.priority().cmp(&other.kind.priority()) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
        self.version.len() > other.version.len()
    }
}

/// 归并中的单个技术
#[derive(Debug)]
struct Candidate<'s> {
    signature: &'s TechnologySignature,
    confidence: u8,
    version: Option<VersionPick>,
    /// 是否有直接命中（否则仅由推导得到）
    direct: bool,
    implied_by: Vec<String>,
    alive: bool,
}

impl<'s> Candidate<'s> {
    fn direct(signature: &'s TechnologySignature) -> Self {
        Self {
            signature,
            confidence: 0,
            version: None,
            direct: true,
            implied_by: Vec::new(),
            alive: true,
        }
    }

    fn implied(signature: &'s TechnologySignature, confidence: u8, by: &str) -> Self {
        Self {
            signature,
            confidence,
            version: None,
            direct: false,
            implied_by: vec![by.to_string()],
            alive: true,
        }
    }

    fn absorb(&mut self, detection: &Detection) {
        self.confidence = saturating_confidence(self.confidence, detection.confidence);
        if let Some(version) = &detection.version {
            let pick = VersionPick {
                version: version.clone(),
                confidence: detection.confidence,
                kind: detection.kind,
            };
            if self.version.as_ref().map_or(true, |current| pick.beats(current)) {
                self.version = Some(pick);
            }
        }
    }
}

/// 置信度饱和累加，上限100
#[inline]
pub fn saturating_confidence(current: u8, contribution: u8) -> u8 {
    current.saturating_add(contribution).min(100)
}

/// 结果归并器
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'s> {
    store: &'s SignatureStore,
}

impl<'s> Resolver<'s> {
    pub fn new(store: &'s SignatureStore) -> Self {
        Self { store }
    }

    /// 归并检测记录，输出按置信度降序、名称升序排列
    pub fn resolve(&self, detections: &[Detection]) -> Vec<Resolution> {
        let mut candidates: Vec<Candidate<'s>> = Vec::new();
        let mut index: FxHashMap<&'s str, usize> = FxHashMap::default();

        // 1-3. 分组 + 饱和累加 + 版本择优（候选顺序即发现顺序）
        for detection in detections {
            let Some(signature) = self.store.get(&detection.technology_id) else {
                log::debug!(
                    "Ignoring detection for unknown technology: {}",
                    detection.technology_id
                );
                continue;
            };
            let slot = *index.entry(signature.id.as_str()).or_insert_with(|| {
                candidates.push(Candidate::direct(signature));
                candidates.len() - 1
            });
            candidates[slot].absorb(detection);
        }

        self.apply_implications(&mut candidates, &mut index);
        self.apply_exclusions(&mut candidates, &index);

        let mut resolutions: Vec<Resolution> = candidates
            .into_iter()
            .filter(|c| c.alive)
            .map(|c| self.render(c))
            .collect();
        resolutions.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.technology_id.cmp(&b.technology_id))
        });
        log::debug!(
            "Resolution finished | Detections: {} | Technologies: {}",
            detections.len(),
            resolutions.len()
        );
        resolutions
    }

    /// 4. 推导：工作队列 + 已展开置信度表，保证环状推导终止
    /// 推导目标的置信度 = min(推导方置信度, 关系置信度)，不会修改直接命中的技术
    fn apply_implications(
        &self,
        candidates: &mut Vec<Candidate<'s>>,
        index: &mut FxHashMap<&'s str, usize>,
    ) {
        let mut queue: VecDeque<usize> = (0..candidates.len()).collect();
        // 记录每个候选上一次展开时的置信度；置信度未提高则不再展开
        let mut expanded: FxHashMap<usize, u8> = FxHashMap::default();

        while let Some(slot) = queue.pop_front() {
            let confidence = candidates[slot].confidence;
            if expanded.get(&slot).is_some_and(|&seen| seen >= confidence) {
                continue;
            }
            expanded.insert(slot, confidence);

            let implier = candidates[slot].signature;
            for relation in &implier.implies {
                let Some(target) = self.store.get(&relation.target) else {
                    log::debug!(
                        "Ignoring implication {} -> {}: unknown technology",
                        implier.id,
                        relation.target
                    );
                    continue;
                };
                let implied_confidence = confidence.min(relation.confidence);

                match index.get(target.id.as_str()) {
                    Some(&existing) => {
                        let candidate = &mut candidates[existing];
                        if candidate.direct {
                            continue;
                        }
                        if !candidate.implied_by.iter().any(|id| id == &implier.id) {
                            candidate.implied_by.push(implier.id.clone());
                        }
                        if implied_confidence > candidate.confidence {
                            candidate.confidence = implied_confidence;
                            queue.push_back(existing);
                        }
                    }
                    None => {
                        log::debug!(
                            "Implied technology | {} -> {} | Confidence: {}",
                            implier.id,
                            target.id,
                            implied_confidence
                        );
                        candidates.push(Candidate::implied(target, implied_confidence, &implier.id));
                        let new_slot = candidates.len() - 1;
                        index.insert(target.id.as_str(), new_slot);
                        queue.push_back(new_slot);
                    }
                }
            }
        }
    }

    /// 5. 排除：按发现顺序处理，A 排除 B 当且仅当 A 的置信度 ≥ B
    /// 已被排除的技术不再排除其他技术，因此互斥且置信度相同时先发现者保留
    /// 单向排除不看发现顺序：置信度相同时被排除方总是移除
    fn apply_exclusions(&self, candidates: &mut [Candidate<'s>], index: &FxHashMap<&'s str, usize>) {
        for slot in 0..candidates.len() {
            if !candidates[slot].alive {
                continue;
            }
            let excluder = candidates[slot].signature;
            let confidence = candidates[slot].confidence;
            for relation in &excluder.excludes {
                let Some(&target) = index.get(relation.target.as_str()) else {
                    continue;
                };
                if target == slot || !candidates[target].alive {
                    continue;
                }
                if confidence >= candidates[target].confidence {
                    log::debug!(
                        "Excluded technology | {} excludes {} | {} >= {}",
                        excluder.id,
                        relation.target,
                        confidence,
                        candidates[target].confidence
                    );
                    candidates[target].alive = false;
                }
            }
        }
    }

    /// 6. 分类解析 + 输出组装
    fn render(&self, candidate: Candidate<'s>) -> Resolution {
        let signature = candidate.signature;
        let mut categories: Vec<CategoryRef> = signature
            .category_ids
            .iter()
            .map(|id| match self.store.category(id) {
                Some(category) => CategoryRef {
                    id: category.id.clone(),
                    name: category.name.clone(),
                    priority: category.priority,
                },
                None => CategoryRef {
                    id: id.clone(),
                    name: id.clone(),
                    priority: u32::MAX,
                },
            })
            .collect();
        categories.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

        Resolution {
            technology_id: signature.id.clone(),
            name: signature.name.clone(),
            confidence: candidate.confidence,
            version: candidate.version.map(|pick| pick.version),
            categories,
            website: signature.website.clone(),
            icon: signature.icon.clone(),
            implied_by: if candidate.direct {
                Vec::new()
            } else {
                candidate.implied_by
            },
        }
    }
}
