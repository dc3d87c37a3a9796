//! ELF executable image parsing.
//!
//! The simulator consumes statically-linked images: all it needs is the
//! entry point and the LOAD segments with their virtual addresses. This
//! crate extracts exactly that and leaves address arithmetic (image base,
//! PC rebasing) to the machine.

use std::fs;
use std::path::Path;

use elf::ElfBytes;
use elf::abi::PT_LOAD;
use elf::endian::AnyEndian;
use elf::file::Class;
use thiserror::Error;

/// Why an image could not be loaded.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cannot read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed ELF image: {0}")]
    Parse(#[from] elf::ParseError),

    #[error("segment at {vaddr:#x} extends past the end of the file")]
    Truncated { vaddr: u64 },
}

/// One LOAD segment: its virtual address and file payload.
pub struct Segment {
    pub vaddr: u64,
    pub data: Vec<u8>,
}

/// A parsed executable image.
pub struct Image {
    /// Virtual entry point.
    pub entry: u64,
    pub segments: Vec<Segment>,
}

impl Image {
    /// Minimum virtual address across LOAD segments; zero for an image
    /// with no segments.
    #[must_use]
    pub fn base(&self) -> u64 {
        self.segments.iter().map(|s| s.vaddr).min().unwrap_or(0)
    }
}

/// Read and parse an image file.
pub fn load_file(path: &Path) -> Result<Image, ImageError> {
    let bytes = fs::read(path)?;
    log::info!("image file {}", path.display());
    parse(&bytes)
}

/// Parse an ELF image from raw bytes, keeping only LOAD segments.
pub fn parse(bytes: &[u8]) -> Result<Image, ImageError> {
    let file = ElfBytes::<AnyEndian>::minimal_parse(bytes)?;

    log::info!(
        "class {}, {} endian, machine {:#x}, entry {:#x}",
        match file.ehdr.class {
            Class::ELF32 => "ELF32",
            Class::ELF64 => "ELF64",
        },
        match file.ehdr.endianness {
            AnyEndian::Little => "little",
            AnyEndian::Big => "big",
        },
        file.ehdr.e_machine,
        file.ehdr.e_entry,
    );

    let mut segments = Vec::new();
    if let Some(table) = file.segments() {
        for phdr in table.iter() {
            if phdr.p_type != PT_LOAD {
                continue;
            }
            let start = phdr.p_offset as usize;
            let len = phdr.p_filesz as usize;
            let data = bytes
                .get(start..start + len)
                .ok_or(ImageError::Truncated { vaddr: phdr.p_vaddr })?
                .to_vec();
            log::info!(
                "load segment: vaddr {:#x}, {} byte(s)",
                phdr.p_vaddr,
                data.len()
            );
            segments.push(Segment {
                vaddr: phdr.p_vaddr,
                data,
            });
        }
    }
    log::info!("{} load segment(s)", segments.len());

    Ok(Image {
        entry: file.ehdr.e_entry,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_u16(bytes: &mut Vec<u8>, v: u16) {
        bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn push_u32(bytes: &mut Vec<u8>, v: u32) {
        bytes.extend_from_slice(&v.to_le_bytes());
    }

    /// Hand-built minimal ELF32 RISC-V executable with one LOAD segment.
    fn minimal_elf(payload: &[u8]) -> Vec<u8> {
        let mut b = vec![0x7F, b'E', b'L', b'F', 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        push_u16(&mut b, 2); // e_type: EXEC
        push_u16(&mut b, 243); // e_machine: RISC-V
        push_u32(&mut b, 1); // e_version
        push_u32(&mut b, 0x1_0004); // e_entry
        push_u32(&mut b, 52); // e_phoff
        push_u32(&mut b, 0); // e_shoff
        push_u32(&mut b, 0); // e_flags
        push_u16(&mut b, 52); // e_ehsize
        push_u16(&mut b, 32); // e_phentsize
        push_u16(&mut b, 1); // e_phnum
        push_u16(&mut b, 0); // e_shentsize
        push_u16(&mut b, 0); // e_shnum
        push_u16(&mut b, 0); // e_shstrndx

        // Program header.
        push_u32(&mut b, 1); // p_type: LOAD
        push_u32(&mut b, 84); // p_offset
        push_u32(&mut b, 0x1_0000); // p_vaddr
        push_u32(&mut b, 0x1_0000); // p_paddr
        push_u32(&mut b, payload.len() as u32); // p_filesz
        push_u32(&mut b, payload.len() as u32); // p_memsz
        push_u32(&mut b, 5); // p_flags: R+X
        push_u32(&mut b, 0x1000); // p_align

        b.extend_from_slice(payload);
        b
    }

    #[test]
    fn parses_entry_and_load_segment() {
        let payload = [0x93, 0x00, 0x50, 0x00, 0x73, 0x00, 0x00, 0x00];
        let image = parse(&minimal_elf(&payload)).expect("valid image");

        assert_eq!(image.entry, 0x1_0004);
        assert_eq!(image.segments.len(), 1);
        assert_eq!(image.segments[0].vaddr, 0x1_0000);
        assert_eq!(image.segments[0].data, payload);
        assert_eq!(image.base(), 0x1_0000);
    }

    #[test]
    fn truncated_segment_is_rejected() {
        let payload = [0u8; 8];
        let mut bytes = minimal_elf(&payload);
        bytes.truncate(bytes.len() - 4);
        assert!(matches!(
            parse(&bytes),
            Err(ImageError::Truncated { vaddr: 0x1_0000 })
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse(&[0u8; 16]),
            Err(ImageError::Parse(_))
        ));
    }

    #[test]
    fn base_of_empty_image_is_zero() {
        let image = Image {
            entry: 0,
            segments: Vec::new(),
        };
        assert_eq!(image.base(), 0);
    }
}
