use std::collections::HashMap;
use std::rc::Rc;

/// The subset of target information a [`TypeInterner`] needs to size and
/// align pointer types. The richer `Target`/`Platform`/`Architecture` model
/// lives with the driver; this is only what layout computation requires,
/// kept here so the AST crate has no dependency on the driver crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLayout {
    pub pointer_size: u32,
    pub pointer_align: u32,
}

impl TargetLayout {
    /// Handy for tests and for 64-bit hosts; real builds construct this from
    /// the driver's resolved `Target`.
    pub fn host_64() -> Self {
        Self {
            pointer_size: 8,
            pointer_align: 8,
        }
    }
}

/// An interned, structurally hash-consed type. Equality is by `Rc` pointer
/// for composites (struct/union/function/array) and by value for primitives
/// — two `TypeRef`s are the *same* type iff they point at the same
/// allocation, which the interner guarantees for structurally equal keys.
pub type TypeRef = Rc<TypeData>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    pub name: String,
    pub ty: TypeRef,
    pub offset: u64,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TypeData {
    pub kind: TypeKind,
    pub size: u64,
    pub alignment: u64,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Int { width: u8, signed: bool },
    Float { width: u8 },
    /// `base = None` is the untyped `ptr`.
    Pointer { base: Option<TypeRef> },
    /// `size = None` means unbounded (`T[]`, size -1 in the source grammar).
    Array { element: TypeRef, size: Option<u64> },
    Function { params: Vec<TypeRef>, ret: TypeRef, variadic: bool },
    Struct { name: String, fields: Vec<StructField> },
    Union { name: String, fields: Vec<StructField> },
    /// Transparent for equality/assignability; keeps the original name so
    /// diagnostics can cite it instead of the fully unwrapped target.
    Alias { name: String, target: TypeRef },
    /// A type-valued compile-time expression — used only by the `size_of`
    /// / `align_of` / `offset_of` builtins, never by ordinary values.
    Meta { of: TypeRef },
}

/// Follow alias chains to the first non-alias type. Used by assignability
/// and common-type rules, which operate "after unwrapping aliases".
pub fn unwrap_alias(ty: &TypeRef) -> TypeRef {
    let mut current = Rc::clone(ty);
    loop {
        match &current.kind {
            TypeKind::Alias { target, .. } => current = Rc::clone(target),
            _ => return current,
        }
    }
}

impl TypeData {
    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer { .. })
    }

    pub fn is_untyped_ptr(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer { base: None })
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, TypeKind::Int { .. })
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, TypeKind::Float { .. })
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_struct_or_union(&self) -> bool {
        matches!(self.kind, TypeKind::Struct { .. } | TypeKind::Union { .. })
    }

    pub fn fields(&self) -> Option<&[StructField]> {
        match &self.kind {
            TypeKind::Struct { fields, .. } | TypeKind::Union { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    (value + alignment - 1) / alignment * alignment
}

/// A structural key used to deduplicate composite type construction within
/// a module — two calls describing the same shape must yield the same
/// `TypeRef` so identity-by-handle and structural equality agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Void,
    Int(u8, bool),
    Float(u8),
    Pointer(Option<*const TypeData>),
    Array(*const TypeData, Option<u64>),
    Function(Vec<*const TypeData>, *const TypeData, bool),
    Struct(String, Vec<(String, *const TypeData)>),
    Union(String, Vec<(String, *const TypeData)>),
    Alias(String, *const TypeData),
    Meta(*const TypeData),
}

/// One interner per module: "a type constructor cache so structurally
/// identical composite types are materialised once per module."
pub struct TypeInterner {
    layout: TargetLayout,
    cache: HashMap<TypeKey, TypeRef>,
}

impl TypeInterner {
    pub fn new(layout: TargetLayout) -> Self {
        Self {
            layout,
            cache: HashMap::new(),
        }
    }

    fn intern(&mut self, key: TypeKey, make: impl FnOnce() -> TypeData) -> TypeRef {
        if let Some(existing) = self.cache.get(&key) {
            return Rc::clone(existing);
        }
        let data = Rc::new(make());
        self.cache.insert(key, Rc::clone(&data));
        data
    }

    pub fn void(&mut self) -> TypeRef {
        self.intern(TypeKey::Void, || TypeData {
            kind: TypeKind::Void,
            size: 0,
            alignment: 1,
        })
    }

    pub fn int(&mut self, width: u8, signed: bool) -> TypeRef {
        let size = (width / 8) as u64;
        self.intern(TypeKey::Int(width, signed), || TypeData {
            kind: TypeKind::Int { width, signed },
            size,
            alignment: size,
        })
    }

    pub fn float(&mut self, width: u8) -> TypeRef {
        let size = (width / 8) as u64;
        self.intern(TypeKey::Float(width), || TypeData {
            kind: TypeKind::Float { width },
            size,
            alignment: size,
        })
    }

    /// `base = None` constructs the untyped `ptr`.
    pub fn pointer(&mut self, base: Option<TypeRef>) -> TypeRef {
        let key = TypeKey::Pointer(base.as_ref().map(|b| Rc::as_ptr(b)));
        let layout = self.layout;
        self.intern(key, || TypeData {
            kind: TypeKind::Pointer { base },
            size: layout.pointer_size as u64,
            alignment: layout.pointer_align as u64,
        })
    }

    /// `size = None` is the unbounded array form (`-1` in the source
    /// grammar); it carries the element type's alignment but has no size.
    pub fn array(&mut self, element: TypeRef, size: Option<u64>) -> TypeRef {
        let key = TypeKey::Array(Rc::as_ptr(&element), size);
        let element_size = element.size;
        let element_align = element.alignment;
        self.intern(key, || TypeData {
            size: size.map(|n| n * element_size).unwrap_or(0),
            alignment: element_align,
            kind: TypeKind::Array { element, size },
        })
    }

    pub fn function(&mut self, params: Vec<TypeRef>, ret: TypeRef, variadic: bool) -> TypeRef {
        let key = TypeKey::Function(
            params.iter().map(Rc::as_ptr).collect(),
            Rc::as_ptr(&ret),
            variadic,
        );
        let layout = self.layout;
        self.intern(key, || TypeData {
            kind: TypeKind::Function { params, ret, variadic },
            size: layout.pointer_size as u64,
            alignment: layout.pointer_align as u64,
        })
    }

    /// Fields are placed in declaration order, each at
    /// `align_up(cursor, field_align)`; the struct's own size is padded up
    /// to its alignment, which is the max field alignment.
    pub fn structure(&mut self, name: String, field_types: Vec<(String, TypeRef)>) -> TypeRef {
        let key = TypeKey::Struct(
            name.clone(),
            field_types
                .iter()
                .map(|(n, t)| (n.clone(), Rc::as_ptr(t)))
                .collect(),
        );
        self.intern(key, || {
            let mut cursor = 0u64;
            let mut max_align = 1u64;
            let mut fields = Vec::with_capacity(field_types.len());
            for (name, ty) in field_types {
                let offset = align_up(cursor, ty.alignment);
                max_align = max_align.max(ty.alignment);
                cursor = offset + ty.size;
                fields.push(StructField { name, ty, offset });
            }
            let size = align_up(cursor, max_align);
            TypeData {
                kind: TypeKind::Struct { name, fields },
                size,
                alignment: max_align,
            }
        })
    }

    /// All fields share offset 0; size is the widest field rounded up to
    /// the widest alignment.
    pub fn union(&mut self, name: String, field_types: Vec<(String, TypeRef)>) -> TypeRef {
        let key = TypeKey::Union(
            name.clone(),
            field_types
                .iter()
                .map(|(n, t)| (n.clone(), Rc::as_ptr(t)))
                .collect(),
        );
        self.intern(key, || {
            let mut max_size = 0u64;
            let mut max_align = 1u64;
            let mut fields = Vec::with_capacity(field_types.len());
            for (name, ty) in field_types {
                max_size = max_size.max(ty.size);
                max_align = max_align.max(ty.alignment);
                fields.push(StructField { name, ty, offset: 0 });
            }
            TypeData {
                kind: TypeKind::Union { name, fields },
                size: align_up(max_size, max_align),
                alignment: max_align,
            }
        })
    }

    pub fn alias(&mut self, name: String, target: TypeRef) -> TypeRef {
        let key = TypeKey::Alias(name.clone(), Rc::as_ptr(&target));
        let size = target.size;
        let alignment = target.alignment;
        self.intern(key, || TypeData {
            kind: TypeKind::Alias { name, target },
            size,
            alignment,
        })
    }

    pub fn meta(&mut self, of: TypeRef) -> TypeRef {
        let key = TypeKey::Meta(Rc::as_ptr(&of));
        self.intern(key, || TypeData {
            kind: TypeKind::Meta { of },
            size: 0,
            alignment: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_layout_matches_mixed_alignment_rules() {
        let mut interner = TypeInterner::new(TargetLayout::host_64());
        let u8 = interner.int(8, false);
        let u32 = interner.int(32, false);
        let s = interner.structure(
            "S".to_string(),
            vec![("a".to_string(), u8.clone()), ("b".to_string(), u32), ("c".to_string(), u8)],
        );
        assert_eq!(s.size, 12);
        assert_eq!(s.alignment, 4);
        let fields = s.fields().unwrap();
        assert_eq!(fields[0].offset, 0);
        assert_eq!(fields[1].offset, 4);
        assert_eq!(fields[2].offset, 8);
    }

    #[test]
    fn union_fields_all_sit_at_offset_zero() {
        let mut interner = TypeInterner::new(TargetLayout::host_64());
        let i8 = interner.int(8, true);
        let i64 = interner.int(64, true);
        let u = interner.union("U".to_string(), vec![("a".to_string(), i8), ("b".to_string(), i64)]);
        assert_eq!(u.size, 8);
        assert_eq!(u.alignment, 8);
        for field in u.fields().unwrap() {
            assert_eq!(field.offset, 0);
        }
    }

    #[test]
    fn repeated_construction_yields_the_same_handle() {
        let mut interner = TypeInterner::new(TargetLayout::host_64());
        let a = interner.int(32, true);
        let b = interner.int(32, true);
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn alias_chain_unwraps_to_the_same_underlying_type() {
        let mut interner = TypeInterner::new(TargetLayout::host_64());
        let i32 = interner.int(32, true);
        let a = interner.alias("A".to_string(), i32.clone());
        let c = interner.alias("C".to_string(), a);
        assert!(Rc::ptr_eq(&unwrap_alias(&c), &i32));
    }
}
