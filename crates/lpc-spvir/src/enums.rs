//! SPIR-V enumerants used by the IR.
//!
//! Value enums map one wire value to one variant. Bitmask enums keep the raw
//! mask and know which bits are legal.

use core::fmt;

macro_rules! value_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            /// Decode a wire value
            pub fn from_u32(value: u32) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Encode to the wire value
            pub fn as_u32(self) -> u32 {
                match self {
                    $(Self::$variant => $value,)*
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                }
            }

            /// Look up a variant by its name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($variant) => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

macro_rules! bitmask_enum {
    ($(#[$meta:meta])* $name:ident { $($flag:ident = $value:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u32);

        #[allow(non_upper_case_globals)]
        impl $name {
            $(pub const $flag: Self = Self($value);)*

            const ALL: &'static [(&'static str, u32)] = &[$((stringify!($flag), $value),)*];

            /// Decode a wire mask, rejecting unknown bits
            pub fn from_bits(bits: u32) -> Option<Self> {
                let known = Self::ALL.iter().fold(0, |acc, (_, v)| acc | v);
                (bits & !known == 0).then_some(Self(bits))
            }

            pub fn bits(self) -> u32 {
                self.0
            }

            /// Parse `None` or `|`-separated flag names
            pub fn from_names(names: &str) -> Option<Self> {
                if names == "None" {
                    return Some(Self(0));
                }
                let mut bits = 0;
                for name in names.split('|') {
                    let (_, value) = Self::ALL.iter().find(|(n, _)| *n == name)?;
                    bits |= value;
                }
                Some(Self(bits))
            }

            pub fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.0 == 0 {
                    return f.write_str("None");
                }
                let mut first = true;
                for (name, value) in Self::ALL {
                    if *value != 0 && self.0 & value == *value {
                        if !first {
                            f.write_str("|")?;
                        }
                        f.write_str(name)?;
                        first = false;
                    }
                }
                Ok(())
            }
        }
    };
}

value_enum!(
    /// Where a pointer points.
    StorageClass {
        UniformConstant = 0,
        Input = 1,
        Uniform = 2,
        Output = 3,
        Workgroup = 4,
        CrossWorkgroup = 5,
        Private = 6,
        Function = 7,
        Generic = 8,
        PushConstant = 9,
        AtomicCounter = 10,
        Image = 11,
        StorageBuffer = 12,
        TileImageEXT = 4172,
        CallableDataKHR = 5328,
        IncomingCallableDataKHR = 5329,
        RayPayloadKHR = 5338,
        HitAttributeKHR = 5339,
        IncomingRayPayloadKHR = 5342,
        ShaderRecordBufferKHR = 5343,
        PhysicalStorageBuffer = 5349,
        CodeSectionINTEL = 5605,
        DeviceOnlyINTEL = 5936,
        HostOnlyINTEL = 5937,
    }
);

value_enum!(
    Decoration {
        RelaxedPrecision = 0,
        SpecId = 1,
        Block = 2,
        BufferBlock = 3,
        RowMajor = 4,
        ColMajor = 5,
        ArrayStride = 6,
        MatrixStride = 7,
        GLSLShared = 8,
        GLSLPacked = 9,
        CPacked = 10,
        BuiltIn = 11,
        NoPerspective = 13,
        Flat = 14,
        Patch = 15,
        Centroid = 16,
        Sample = 17,
        Invariant = 18,
        Restrict = 19,
        Aliased = 20,
        Volatile = 21,
        Constant = 22,
        Coherent = 23,
        NonWritable = 24,
        NonReadable = 25,
        Uniform = 26,
        UniformId = 27,
        SaturatedConversion = 28,
        Stream = 29,
        Location = 30,
        Component = 31,
        Index = 32,
        Binding = 33,
        DescriptorSet = 34,
        Offset = 35,
        XfbBuffer = 36,
        XfbStride = 37,
        FuncParamAttr = 38,
        FPRoundingMode = 39,
        FPFastMathMode = 40,
        LinkageAttributes = 41,
        NoContraction = 42,
        InputAttachmentIndex = 43,
        Alignment = 44,
        MaxByteOffset = 45,
        AlignmentId = 46,
        MaxByteOffsetId = 47,
        NoSignedWrap = 4469,
        NoUnsignedWrap = 4470,
        RestrictPointer = 5355,
        AliasedPointer = 5356,
        CacheControlLoadINTEL = 6442,
        CacheControlStoreINTEL = 6443,
    }
);

impl Decoration {
    /// Attribute name used when the decoration is attached to an op
    pub fn attr_name(self) -> alloc::string::String {
        snake_case(self.name())
    }
}

value_enum!(
    BuiltIn {
        Position = 0,
        PointSize = 1,
        ClipDistance = 3,
        CullDistance = 4,
        VertexId = 5,
        InstanceId = 6,
        PrimitiveId = 7,
        InvocationId = 8,
        Layer = 9,
        ViewportIndex = 10,
        TessLevelOuter = 11,
        TessLevelInner = 12,
        TessCoord = 13,
        PatchVertices = 14,
        FragCoord = 15,
        PointCoord = 16,
        FrontFacing = 17,
        SampleId = 18,
        SamplePosition = 19,
        SampleMask = 20,
        FragDepth = 22,
        HelperInvocation = 23,
        NumWorkgroups = 24,
        WorkgroupSize = 25,
        WorkgroupId = 26,
        LocalInvocationId = 27,
        GlobalInvocationId = 28,
        LocalInvocationIndex = 29,
        WorkDim = 30,
        GlobalSize = 31,
        EnqueuedWorkgroupSize = 32,
        GlobalOffset = 33,
        GlobalLinearId = 34,
        SubgroupSize = 36,
        SubgroupMaxSize = 37,
        NumSubgroups = 38,
        NumEnqueuedSubgroups = 39,
        SubgroupId = 40,
        SubgroupLocalInvocationId = 41,
        VertexIndex = 42,
        InstanceIndex = 43,
    }
);

value_enum!(
    Capability {
        Matrix = 0,
        Shader = 1,
        Geometry = 2,
        Tessellation = 3,
        Addresses = 4,
        Linkage = 5,
        Kernel = 6,
        Vector16 = 7,
        Float16Buffer = 8,
        Float16 = 9,
        Float64 = 10,
        Int64 = 11,
        Int64Atomics = 12,
        ImageBasic = 13,
        ImageReadWrite = 14,
        ImageMipmap = 15,
        Pipes = 17,
        Groups = 18,
        DeviceEnqueue = 19,
        LiteralSampler = 20,
        AtomicStorage = 21,
        Int16 = 22,
        TessellationPointSize = 23,
        GeometryPointSize = 24,
        ImageGatherExtended = 25,
        StorageImageMultisample = 27,
        UniformBufferArrayDynamicIndexing = 28,
        SampledImageArrayDynamicIndexing = 29,
        StorageBufferArrayDynamicIndexing = 30,
        StorageImageArrayDynamicIndexing = 31,
        ClipDistance = 32,
        CullDistance = 33,
        ImageCubeArray = 34,
        SampleRateShading = 35,
        ImageRect = 36,
        SampledRect = 37,
        GenericPointer = 38,
        Int8 = 39,
        InputAttachment = 40,
        SparseResidency = 41,
        MinLod = 42,
        Sampled1D = 43,
        Image1D = 44,
        SampledCubeArray = 45,
        SampledBuffer = 46,
        ImageBuffer = 47,
        ImageMSArray = 48,
        StorageImageExtendedFormats = 49,
        ImageQuery = 50,
        DerivativeControl = 51,
        InterpolationFunction = 52,
        TransformFeedback = 53,
        GeometryStreams = 54,
        StorageImageReadWithoutFormat = 55,
        StorageImageWriteWithoutFormat = 56,
        MultiViewport = 57,
        SubgroupDispatch = 58,
        NamedBarrier = 59,
        PipeStorage = 60,
        GroupNonUniform = 61,
        GroupNonUniformVote = 62,
        GroupNonUniformArithmetic = 63,
        GroupNonUniformBallot = 64,
        GroupNonUniformShuffle = 65,
        GroupNonUniformShuffleRelative = 66,
        GroupNonUniformClustered = 67,
        GroupNonUniformQuad = 68,
        ShaderLayer = 69,
        ShaderViewportIndex = 70,
        UniformDecoration = 71,
        StorageBuffer16BitAccess = 4433,
        UniformAndStorageBuffer16BitAccess = 4434,
        StoragePushConstant16 = 4435,
        StorageInputOutput16 = 4436,
        VariablePointersStorageBuffer = 4441,
        VariablePointers = 4442,
        StorageBuffer8BitAccess = 4448,
        UniformAndStorageBuffer8BitAccess = 4449,
        StoragePushConstant8 = 4450,
        TensorsARM = 4174,
        BFloat16TypeKHR = 5116,
        VulkanMemoryModel = 5345,
        VulkanMemoryModelDeviceScope = 5346,
        PhysicalStorageBufferAddresses = 5347,
        CooperativeMatrixKHR = 6022,
        ReplicatedCompositesEXT = 6024,
        CacheControlsINTEL = 6441,
    }
);

value_enum!(
    ExecutionModel {
        Vertex = 0,
        TessellationControl = 1,
        TessellationEvaluation = 2,
        Geometry = 3,
        Fragment = 4,
        GLCompute = 5,
        Kernel = 6,
    }
);

value_enum!(
    ExecutionMode {
        Invocations = 0,
        SpacingEqual = 1,
        SpacingFractionalEven = 2,
        SpacingFractionalOdd = 3,
        VertexOrderCw = 4,
        VertexOrderCcw = 5,
        PixelCenterInteger = 6,
        OriginUpperLeft = 7,
        OriginLowerLeft = 8,
        EarlyFragmentTests = 9,
        PointMode = 10,
        Xfb = 11,
        DepthReplacing = 12,
        DepthGreater = 14,
        DepthLess = 15,
        DepthUnchanged = 16,
        LocalSize = 17,
        LocalSizeHint = 18,
        InputPoints = 19,
        InputLines = 20,
        InputLinesAdjacency = 21,
        Triangles = 22,
        InputTrianglesAdjacency = 23,
        Quads = 24,
        Isolines = 25,
        OutputVertices = 26,
        OutputPoints = 27,
        OutputLineStrip = 28,
        OutputTriangleStrip = 29,
        VecTypeHint = 30,
        ContractionOff = 31,
        Initializer = 33,
        Finalizer = 34,
        SubgroupSize = 35,
        SubgroupsPerWorkgroup = 36,
        SubgroupsPerWorkgroupId = 37,
        LocalSizeId = 38,
        LocalSizeHintId = 39,
    }
);

value_enum!(
    AddressingModel {
        Logical = 0,
        Physical32 = 1,
        Physical64 = 2,
        PhysicalStorageBuffer64 = 5348,
    }
);

value_enum!(
    MemoryModel {
        Simple = 0,
        GLSL450 = 1,
        OpenCL = 2,
        Vulkan = 3,
    }
);

value_enum!(
    LinkageType {
        Export = 0,
        Import = 1,
        LinkOnceODR = 2,
    }
);

value_enum!(
    FPRoundingMode {
        RTE = 0,
        RTZ = 1,
        RTP = 2,
        RTN = 3,
    }
);

value_enum!(
    Dim {
        Dim1D = 0,
        Dim2D = 1,
        Dim3D = 2,
        Cube = 3,
        Rect = 4,
        Buffer = 5,
        SubpassData = 6,
    }
);

value_enum!(
    ImageDepthInfo {
        NoDepth = 0,
        IsDepth = 1,
        DepthUnknown = 2,
    }
);

value_enum!(
    ImageArrayedInfo {
        NonArrayed = 0,
        Arrayed = 1,
    }
);

value_enum!(
    ImageSamplingInfo {
        SingleSampled = 0,
        MultiSampled = 1,
    }
);

value_enum!(
    ImageSamplerUseInfo {
        SamplerUnknown = 0,
        NeedSampler = 1,
        NoSampler = 2,
    }
);

value_enum!(
    ImageFormat {
        Unknown = 0,
        Rgba32f = 1,
        Rgba16f = 2,
        R32f = 3,
        Rgba8 = 4,
        Rgba8Snorm = 5,
        Rg32f = 6,
        Rg16f = 7,
        R11fG11fB10f = 8,
        R16f = 9,
        Rgba16 = 10,
        Rgb10A2 = 11,
        Rg16 = 12,
        Rg8 = 13,
        R16 = 14,
        R8 = 15,
        Rgba16Snorm = 16,
        Rg16Snorm = 17,
        Rg8Snorm = 18,
        R16Snorm = 19,
        R8Snorm = 20,
        Rgba32i = 21,
        Rgba16i = 22,
        Rgba8i = 23,
        R32i = 24,
        Rg32i = 25,
        Rg16i = 26,
        Rg8i = 27,
        R16i = 28,
        R8i = 29,
        Rgba32ui = 30,
        Rgba16ui = 31,
        Rgba8ui = 32,
        R32ui = 33,
        Rgb10a2ui = 34,
        Rg32ui = 35,
        Rg16ui = 36,
        Rg8ui = 37,
        R16ui = 38,
        R8ui = 39,
        R64ui = 40,
        R64i = 41,
    }
);

value_enum!(
    Scope {
        CrossDevice = 0,
        Device = 1,
        Workgroup = 2,
        Subgroup = 3,
        Invocation = 4,
        QueueFamily = 5,
        ShaderCallKHR = 6,
    }
);

value_enum!(
    CooperativeMatrixUse {
        MatrixAKHR = 0,
        MatrixBKHR = 1,
        MatrixAccumulatorKHR = 2,
    }
);

value_enum!(
    /// Float encodings other than IEEE 754.
    FPEncoding {
        BFloat16KHR = 0,
    }
);

bitmask_enum!(
    FunctionControl {
        NONE = 0,
        Inline = 0x1,
        DontInline = 0x2,
        Pure = 0x4,
        Const = 0x8,
        OptNoneEXT = 0x10000,
    }
);

bitmask_enum!(
    SelectionControl {
        NONE = 0,
        Flatten = 0x1,
        DontFlatten = 0x2,
    }
);

bitmask_enum!(
    LoopControl {
        NONE = 0,
        Unroll = 0x1,
        DontUnroll = 0x2,
        DependencyInfinite = 0x4,
        DependencyLength = 0x8,
        MinIterations = 0x10,
        MaxIterations = 0x20,
        IterationMultiple = 0x40,
        PeelCount = 0x80,
        PartialCount = 0x100,
    }
);

bitmask_enum!(
    MemoryAccess {
        NONE = 0,
        Volatile = 0x1,
        Aligned = 0x2,
        Nontemporal = 0x4,
    }
);

bitmask_enum!(
    FPFastMathMode {
        NONE = 0,
        NotNaN = 0x1,
        NotInf = 0x2,
        NSZ = 0x4,
        AllowRecip = 0x8,
        Fast = 0x10,
    }
);

/// Convert a CamelCase enumerant name to snake_case.
///
/// Runs of capitals stay together, so `FPFastMathMode` becomes
/// `fp_fast_math_mode`.
pub fn snake_case(name: &str) -> alloc::string::String {
    let chars: alloc::vec::Vec<char> = name.chars().collect();
    let mut out = alloc::string::String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            if i > 0 && (prev_lower || (prev_upper && next_lower)) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
