/// Supported SPIR-V opcodes with their binary discriminants.
///
/// This is the subset the IR, loader and analyses understand. Decoding a
/// binary that contains any other opcode is an `InvalidBinary` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Op {
    Nop = 0,
    Undef = 1,
    SourceContinued = 2,
    Source = 3,
    SourceExtension = 4,
    Name = 5,
    MemberName = 6,
    String = 7,
    Line = 8,
    Extension = 10,
    ExtInstImport = 11,
    ExtInst = 12,
    MemoryModel = 14,
    EntryPoint = 15,
    ExecutionMode = 16,
    Capability = 17,
    // Types
    TypeVoid = 19,
    TypeBool = 20,
    TypeInt = 21,
    TypeFloat = 22,
    TypeVector = 23,
    TypeMatrix = 24,
    TypeImage = 25,
    TypeSampler = 26,
    TypeSampledImage = 27,
    TypeArray = 28,
    TypeRuntimeArray = 29,
    TypeStruct = 30,
    TypeOpaque = 31,
    TypePointer = 32,
    TypeFunction = 33,
    TypeForwardPointer = 39,
    // Constants
    ConstantTrue = 41,
    ConstantFalse = 42,
    Constant = 43,
    ConstantComposite = 44,
    ConstantNull = 46,
    SpecConstantTrue = 48,
    SpecConstantFalse = 49,
    SpecConstant = 50,
    SpecConstantComposite = 51,
    SpecConstantOp = 52,
    // Functions
    Function = 54,
    FunctionParameter = 55,
    FunctionEnd = 56,
    FunctionCall = 57,
    // Memory
    Variable = 59,
    Load = 61,
    Store = 62,
    CopyMemory = 63,
    AccessChain = 65,
    // Annotations
    Decorate = 71,
    MemberDecorate = 72,
    DecorationGroup = 73,
    GroupDecorate = 74,
    GroupMemberDecorate = 75,
    // Composites
    VectorShuffle = 79,
    CompositeConstruct = 80,
    CompositeExtract = 81,
    CompositeInsert = 82,
    // Conversions
    ConvertFToU = 109,
    ConvertFToS = 110,
    ConvertSToF = 111,
    ConvertUToF = 112,
    UConvert = 113,
    SConvert = 114,
    FConvert = 115,
    Bitcast = 124,
    // Arithmetic
    SNegate = 126,
    FNegate = 127,
    IAdd = 128,
    FAdd = 129,
    ISub = 130,
    FSub = 131,
    IMul = 132,
    FMul = 133,
    UDiv = 134,
    SDiv = 135,
    FDiv = 136,
    UMod = 137,
    SRem = 138,
    SMod = 139,
    FRem = 140,
    FMod = 141,
    VectorTimesScalar = 142,
    MatrixTimesScalar = 143,
    VectorTimesMatrix = 144,
    MatrixTimesVector = 145,
    MatrixTimesMatrix = 146,
    OuterProduct = 147,
    Dot = 148,
    // Logical
    Any = 154,
    All = 155,
    IsNan = 156,
    IsInf = 157,
    LogicalEqual = 164,
    LogicalNotEqual = 165,
    LogicalOr = 166,
    LogicalAnd = 167,
    LogicalNot = 168,
    Select = 169,
    IEqual = 170,
    INotEqual = 171,
    UGreaterThan = 172,
    SGreaterThan = 173,
    UGreaterThanEqual = 174,
    SGreaterThanEqual = 175,
    ULessThan = 176,
    SLessThan = 177,
    ULessThanEqual = 178,
    SLessThanEqual = 179,
    FOrdEqual = 180,
    FUnordEqual = 181,
    FOrdNotEqual = 182,
    FUnordNotEqual = 183,
    FOrdLessThan = 184,
    FUnordLessThan = 185,
    FOrdGreaterThan = 186,
    FUnordGreaterThan = 187,
    FOrdLessThanEqual = 188,
    FUnordLessThanEqual = 189,
    FOrdGreaterThanEqual = 190,
    FUnordGreaterThanEqual = 191,
    // Bit
    ShiftRightLogical = 194,
    ShiftRightArithmetic = 195,
    ShiftLeftLogical = 196,
    BitwiseOr = 197,
    BitwiseXor = 198,
    BitwiseAnd = 199,
    Not = 200,
    // Control flow
    Phi = 245,
    LoopMerge = 246,
    SelectionMerge = 247,
    Label = 248,
    Branch = 249,
    BranchConditional = 250,
    Switch = 251,
    Kill = 252,
    Return = 253,
    ReturnValue = 254,
    Unreachable = 255,
    NoLine = 317,
}

/// Module section an instruction outside any function belongs to.
///
/// The variants are in the order the SPIR-V logical layout mandates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Capabilities,
    Extensions,
    ExtInstImports,
    MemoryModel,
    EntryPoints,
    ExecutionModes,
    DebugSources,
    DebugNames,
    Annotations,
    TypesAndValues,
}

impl Op {
    /// Decode a raw 16-bit opcode value.
    pub fn from_u16(value: u16) -> Option<Self> {
        use Op::*;
        let op = match value {
            0 => Nop,
            1 => Undef,
            2 => SourceContinued,
            3 => Source,
            4 => SourceExtension,
            5 => Name,
            6 => MemberName,
            7 => String,
            8 => Line,
            10 => Extension,
            11 => ExtInstImport,
            12 => ExtInst,
            14 => MemoryModel,
            15 => EntryPoint,
            16 => ExecutionMode,
            17 => Capability,
            19 => TypeVoid,
            20 => TypeBool,
            21 => TypeInt,
            22 => TypeFloat,
            23 => TypeVector,
            24 => TypeMatrix,
            25 => TypeImage,
            26 => TypeSampler,
            27 => TypeSampledImage,
            28 => TypeArray,
            29 => TypeRuntimeArray,
            30 => TypeStruct,
            31 => TypeOpaque,
            32 => TypePointer,
            33 => TypeFunction,
            39 => TypeForwardPointer,
            41 => ConstantTrue,
            42 => ConstantFalse,
            43 => Constant,
            44 => ConstantComposite,
            46 => ConstantNull,
            48 => SpecConstantTrue,
            49 => SpecConstantFalse,
            50 => SpecConstant,
            51 => SpecConstantComposite,
            52 => SpecConstantOp,
            54 => Function,
            55 => FunctionParameter,
            56 => FunctionEnd,
            57 => FunctionCall,
            59 => Variable,
            61 => Load,
            62 => Store,
            63 => CopyMemory,
            65 => AccessChain,
            71 => Decorate,
            72 => MemberDecorate,
            73 => DecorationGroup,
            74 => GroupDecorate,
            75 => GroupMemberDecorate,
            79 => VectorShuffle,
            80 => CompositeConstruct,
            81 => CompositeExtract,
            82 => CompositeInsert,
            109 => ConvertFToU,
            110 => ConvertFToS,
            111 => ConvertSToF,
            112 => ConvertUToF,
            113 => UConvert,
            114 => SConvert,
            115 => FConvert,
            124 => Bitcast,
            126 => SNegate,
            127 => FNegate,
            128 => IAdd,
            129 => FAdd,
            130 => ISub,
            131 => FSub,
            132 => IMul,
            133 => FMul,
            134 => UDiv,
            135 => SDiv,
            136 => FDiv,
            137 => UMod,
            138 => SRem,
            139 => SMod,
            140 => FRem,
            141 => FMod,
            142 => VectorTimesScalar,
            143 => MatrixTimesScalar,
            144 => VectorTimesMatrix,
            145 => MatrixTimesVector,
            146 => MatrixTimesMatrix,
            147 => OuterProduct,
            148 => Dot,
            154 => Any,
            155 => All,
            156 => IsNan,
            157 => IsInf,
            164 => LogicalEqual,
            165 => LogicalNotEqual,
            166 => LogicalOr,
            167 => LogicalAnd,
            168 => LogicalNot,
            169 => Select,
            170 => IEqual,
            171 => INotEqual,
            172 => UGreaterThan,
            173 => SGreaterThan,
            174 => UGreaterThanEqual,
            175 => SGreaterThanEqual,
            176 => ULessThan,
            177 => SLessThan,
            178 => ULessThanEqual,
            179 => SLessThanEqual,
            180 => FOrdEqual,
            181 => FUnordEqual,
            182 => FOrdNotEqual,
            183 => FUnordNotEqual,
            184 => FOrdLessThan,
            185 => FUnordLessThan,
            186 => FOrdGreaterThan,
            187 => FUnordGreaterThan,
            188 => FOrdLessThanEqual,
            189 => FUnordLessThanEqual,
            190 => FOrdGreaterThanEqual,
            191 => FUnordGreaterThanEqual,
            194 => ShiftRightLogical,
            195 => ShiftRightArithmetic,
            196 => ShiftLeftLogical,
            197 => BitwiseOr,
            198 => BitwiseXor,
            199 => BitwiseAnd,
            200 => Not,
            245 => Phi,
            246 => LoopMerge,
            247 => SelectionMerge,
            248 => Label,
            249 => Branch,
            250 => BranchConditional,
            251 => Switch,
            252 => Kill,
            253 => Return,
            254 => ReturnValue,
            255 => Unreachable,
            317 => NoLine,
            _ => return None,
        };
        Some(op)
    }

    /// Raw binary discriminant.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// True for opcodes that end a basic block.
    #[must_use]
    pub const fn is_terminator(self) -> bool {
        matches!(
            self,
            Self::Branch
                | Self::BranchConditional
                | Self::Switch
                | Self::Kill
                | Self::Return
                | Self::ReturnValue
                | Self::Unreachable
        )
    }

    /// True for opcodes that declare a type.
    #[must_use]
    pub const fn is_type_decl(self) -> bool {
        matches!(
            self,
            Self::TypeVoid
                | Self::TypeBool
                | Self::TypeInt
                | Self::TypeFloat
                | Self::TypeVector
                | Self::TypeMatrix
                | Self::TypeImage
                | Self::TypeSampler
                | Self::TypeSampledImage
                | Self::TypeArray
                | Self::TypeRuntimeArray
                | Self::TypeStruct
                | Self::TypeOpaque
                | Self::TypePointer
                | Self::TypeFunction
                | Self::TypeForwardPointer
        )
    }

    /// True for opcodes that declare a constant.
    #[must_use]
    pub const fn is_constant(self) -> bool {
        matches!(
            self,
            Self::ConstantTrue
                | Self::ConstantFalse
                | Self::Constant
                | Self::ConstantComposite
                | Self::ConstantNull
                | Self::SpecConstantTrue
                | Self::SpecConstantFalse
                | Self::SpecConstant
                | Self::SpecConstantComposite
                | Self::SpecConstantOp
        )
    }

    /// True for decoration opcodes (the `OpDecorate` family).
    #[must_use]
    pub const fn is_annotation(self) -> bool {
        matches!(
            self,
            Self::Decorate
                | Self::MemberDecorate
                | Self::DecorationGroup
                | Self::GroupDecorate
                | Self::GroupMemberDecorate
        )
    }

    /// True for the line-debug opcodes that attach to the next instruction.
    #[must_use]
    pub const fn is_debug_line(self) -> bool {
        matches!(self, Self::Line | Self::NoLine)
    }

    /// Module section this opcode is routed to when it appears outside a
    /// function. `None` for opcodes that only appear inside function bodies
    /// (or that open one).
    #[must_use]
    pub const fn section(self) -> Option<Section> {
        let section = match self {
            Self::Capability => Section::Capabilities,
            Self::Extension => Section::Extensions,
            Self::ExtInstImport => Section::ExtInstImports,
            Self::MemoryModel => Section::MemoryModel,
            Self::EntryPoint => Section::EntryPoints,
            Self::ExecutionMode => Section::ExecutionModes,
            Self::Source | Self::SourceContinued | Self::SourceExtension | Self::String => {
                Section::DebugSources
            }
            Self::Name | Self::MemberName => Section::DebugNames,
            Self::Decorate
            | Self::MemberDecorate
            | Self::DecorationGroup
            | Self::GroupDecorate
            | Self::GroupMemberDecorate => Section::Annotations,
            _ => {
                if self.is_type_decl() || self.is_constant() {
                    Section::TypesAndValues
                } else if matches!(self, Self::Variable | Self::Undef) {
                    // Module-scope variables and undefs share the type section.
                    Section::TypesAndValues
                } else {
                    return None;
                }
            }
        };
        Some(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_discriminants() {
        for op in [
            Op::Nop,
            Op::TypeVector,
            Op::Constant,
            Op::Function,
            Op::Phi,
            Op::LoopMerge,
            Op::Unreachable,
            Op::NoLine,
        ] {
            assert_eq!(Op::from_u16(op.as_u16()), Some(op));
        }
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(Op::from_u16(9), None);
        assert_eq!(Op::from_u16(4096), None);
    }

    #[test]
    fn test_terminators() {
        assert!(Op::Branch.is_terminator());
        assert!(Op::Switch.is_terminator());
        assert!(Op::Return.is_terminator());
        assert!(!Op::Label.is_terminator());
        assert!(!Op::Phi.is_terminator());
    }

    #[test]
    fn test_section_routing() {
        assert_eq!(Op::Capability.section(), Some(Section::Capabilities));
        assert_eq!(Op::Name.section(), Some(Section::DebugNames));
        assert_eq!(Op::Decorate.section(), Some(Section::Annotations));
        assert_eq!(Op::TypeInt.section(), Some(Section::TypesAndValues));
        assert_eq!(Op::Variable.section(), Some(Section::TypesAndValues));
        assert_eq!(Op::Function.section(), None);
        assert_eq!(Op::Label.section(), None);
    }
}
