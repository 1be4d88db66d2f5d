use kernel_acpi::TableRef;
use kernel_acpi::madt::Madt;
use kernel_info::addr::PhysicalAddress;
use kernel_info::limits::NCPU;
use kernel_mp::{CpuStatus, discover_topology};

fn lapic(apic_id: u8, enabled: bool) -> Vec<u8> {
    vec![0, 8, apic_id, apic_id, u8::from(enabled), 0, 0, 0]
}

fn ioapic(id: u8, address: u32, gsi_base: u32) -> Vec<u8> {
    let mut r = vec![1, 12, id, 0];
    r.extend_from_slice(&address.to_le_bytes());
    r.extend_from_slice(&gsi_base.to_le_bytes());
    r
}

fn iso(source: u8, gsi: u32) -> Vec<u8> {
    let mut r = vec![2, 10, 0, source];
    r.extend_from_slice(&gsi.to_le_bytes());
    r.extend_from_slice(&0u16.to_le_bytes());
    r
}

fn madt(records: &[Vec<u8>]) -> Vec<u8> {
    let mut t = Vec::new();
    t.extend_from_slice(b"APIC");
    t.extend_from_slice(&[0; 4]);
    t.extend_from_slice(&[0; 28]);
    t.extend_from_slice(&0xFEE0_0000u32.to_le_bytes());
    t.extend_from_slice(&1u32.to_le_bytes());
    for r in records {
        t.extend_from_slice(r);
    }
    let len = u32::try_from(t.len()).unwrap();
    t[4..8].copy_from_slice(&len.to_le_bytes());
    t
}

fn parse(bytes: &[u8]) -> Madt<'_> {
    Madt::parse(TableRef::from_bytes(PhysicalAddress::new(0x7FE_0000), bytes).unwrap()).unwrap()
}

#[test]
fn enabled_cpus_in_table_order() {
    let t = madt(&[lapic(0, true), lapic(1, false), lapic(4, true), lapic(2, true)]);
    let topo = discover_topology(&parse(&t));

    let ids: Vec<_> = topo.cpus.iter().map(|c| c.apic_id).collect();
    assert_eq!(ids, [0, 4, 2]);
    assert_eq!(topo.cpus.boot_cpu().unwrap().status, CpuStatus::Started);
    assert_eq!(topo.lapic_address, PhysicalAddress::new(0xFEE0_0000));
}

#[test]
fn cpu_list_is_capped() {
    let records: Vec<_> = (0..u8::try_from(NCPU + 3).unwrap())
        .map(|id| lapic(id, id % 4 != 3))
        .collect();
    let enabled = records.iter().filter(|r| r[4] == 1).count();
    let t = madt(&records);
    let topo = discover_topology(&parse(&t));

    assert_eq!(topo.ncpu(), enabled.min(NCPU));
    assert_eq!(topo.cpus.dropped(), enabled.saturating_sub(NCPU));
}

#[test]
fn keeps_first_ioapic_with_gsi_base_zero() {
    let t = madt(&[
        ioapic(1, 0xFEC1_0000, 24),
        ioapic(2, 0xFEC0_0000, 0),
        ioapic(3, 0xFEC2_0000, 0),
        lapic(0, true),
    ]);
    let topo = discover_topology(&parse(&t));
    let io = topo.ioapic.unwrap();
    assert_eq!(io.id, 2);
    assert_eq!(io.address, PhysicalAddress::new(0xFEC0_0000));
}

#[test]
fn no_ioapic() {
    let t = madt(&[lapic(0, true)]);
    assert!(discover_topology(&parse(&t)).ioapic.is_none());
}

#[test]
fn collects_interrupt_overrides() {
    let t = madt(&[lapic(0, true), iso(0, 2), iso(9, 9)]);
    let topo = discover_topology(&parse(&t));
    assert_eq!(topo.overrides.len(), 2);
    assert_eq!(topo.overrides.gsi_for_isa_irq(0), 2);
}

#[test]
fn zero_length_record_terminates() {
    let t = madt(&[lapic(0, true), vec![0, 0, 0, 0, 0, 0, 0, 0], lapic(1, true)]);
    let topo = discover_topology(&parse(&t));
    assert_eq!(topo.ncpu(), 1);
}
