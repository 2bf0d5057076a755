use ash::vk::{
    self,
    PhysicalDeviceType,
    QueueFlags,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueIndices
{
    pub graphics: u32,
    pub present: u32,
}

impl QueueIndices
{
    pub fn is_shared(&self) -> bool { self.graphics == self.present }

    /// Distinct family indices, graphics first.
    pub fn unique(&self) -> Vec<u32>
    {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

pub fn device_type_score(device_type: PhysicalDeviceType) -> u64
{
    match device_type {
        PhysicalDeviceType::DISCRETE_GPU => 1000,
        PhysicalDeviceType::INTEGRATED_GPU => 100,
        PhysicalDeviceType::VIRTUAL_GPU => 10,
        PhysicalDeviceType::CPU => 5,
        _ => 1,
    }
}

/// Highest score wins; on a tie the earlier candidate is kept.
pub fn pick_best<T>(candidates: impl IntoIterator<Item = (T, u64)>) -> Option<T>
{
    let mut best: Option<(T, u64)> = None;

    for (candidate, score) in candidates {
        match &best {
            Some((_, best_score)) if *best_score >= score => {},
            _ => best = Some((candidate, score)),
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Picks queue families for graphics and presentation.
///
/// A family that does both is preferred; otherwise the first graphics family
/// is paired with the first present-capable one.
pub fn select_queue_families<F>(families: &[vk::QueueFamilyProperties], mut supports_present: F)
    -> Result<Option<QueueIndices>, vk::Result>
where
    F: FnMut(u32) -> Result<bool, vk::Result>,
{
    let mut graphics = None;
    let mut present = None;

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;
        let has_graphics = family.queue_count > 0 && family.queue_flags.contains(QueueFlags::GRAPHICS);
        let has_present = supports_present(index)?;

        if has_graphics && has_present {
            return Ok(Some(QueueIndices { graphics: index, present: index }));
        }

        if has_graphics && graphics.is_none() {
            graphics = Some(index);
        }
        if has_present && present.is_none() {
            present = Some(index);
        }
    }

    Ok(graphics.zip(present).map(|(graphics, present)| QueueIndices { graphics, present }))
}

/// Keeps the wanted names that are actually available, in wanted order.
pub fn filter_available<'a>(wanted: &[&'a str], available: &[String]) -> (Vec<&'a str>, Vec<&'a str>)
{
    wanted.iter().copied().partition(|name| available.iter().any(|a| a == name))
}
