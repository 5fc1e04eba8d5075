use log::warn;

use crate::spmi::MAX_SLAVE;

/// compatible string of the port controller's SPMI node
pub const HPM_COMPATIBLE: &str = "usbc,sn201202x,spmi";

/// one node of the hardware description, as far as discovery cares
#[derive(Copy, Clone, Debug)]
pub struct HardwareNode<'a> {
    pub path: &'a str,
    pub compatible: &'a [&'a str],
    /// `reg` cells, the first one is the slave id on the bus
    pub reg: &'a [u32],
    /// first `reg` address of the parent node, i.e. the controller's base
    pub parent_base: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredDevice<'a> {
    pub path: &'a str,
    pub controller_base: u64,
    pub slave_id: u8,
}

/// picks the port controllers out of a list of hardware description nodes
///
/// the caller maps `controller_base` to a register bus and constructs the
/// controller and device from it.
pub fn enumerate<'a, I>(nodes: I) -> impl Iterator<Item = DiscoveredDevice<'a>>
where
    I: IntoIterator<Item = HardwareNode<'a>>,
{
    nodes
        .into_iter()
        .filter(|node| node.compatible.contains(&HPM_COMPATIBLE))
        .filter_map(|node| {
            let Some(&slave) = node.reg.first() else {
                warn!("{}: no reg property, skipping", node.path);
                return None;
            };
            if slave >= MAX_SLAVE as u32 {
                warn!("{}: slave id {slave} out of range, skipping", node.path);
                return None;
            }
            let Some(controller_base) = node.parent_base else {
                warn!("{}: no controller address, skipping", node.path);
                return None;
            };
            Some(DiscoveredDevice {
                path: node.path,
                controller_base,
                slave_id: slave as u8,
            })
        })
}
